// ams-core/src/units.rs

use uom::si::f64::{
    Capacitance as UomCapacitance, ElectricCurrent as UomElectricCurrent,
    ElectricPotential as UomElectricPotential, ElectricalResistance as UomElectricalResistance,
    Energy as UomEnergy, Force as UomForce, Frequency as UomFrequency, Length as UomLength,
    Power as UomPower, Ratio as UomRatio, TemperatureInterval as UomTemperatureInterval,
    ThermodynamicTemperature as UomThermodynamicTemperature, Time as UomTime,
};

// Public canonical unit types (SI, f64)
pub type Capacitance = UomCapacitance;
pub type Current = UomElectricCurrent;
pub type Voltage = UomElectricPotential;
pub type Resistance = UomElectricalResistance;
pub type Energy = UomEnergy;
pub type Force = UomForce;
pub type Frequency = UomFrequency;
pub type Length = UomLength;
pub type Power = UomPower;
pub type Ratio = UomRatio;
pub type TempInterval = UomTemperatureInterval;
pub type Temperature = UomThermodynamicTemperature;
pub type Time = UomTime;

#[inline]
pub fn volt(v: f64) -> Voltage {
    use uom::si::electric_potential::volt;
    Voltage::new::<volt>(v)
}

#[inline]
pub fn amp(v: f64) -> Current {
    use uom::si::electric_current::ampere;
    Current::new::<ampere>(v)
}

#[inline]
pub fn ohm(v: f64) -> Resistance {
    use uom::si::electrical_resistance::ohm;
    Resistance::new::<ohm>(v)
}

#[inline]
pub fn farad(v: f64) -> Capacitance {
    use uom::si::capacitance::farad;
    Capacitance::new::<farad>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

/// Temperature from degrees Celsius (uom applies the 273.15 K offset).
#[inline]
pub fn celsius(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::degree_celsius;
    Temperature::new::<degree_celsius>(v)
}

#[inline]
pub fn watt(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}

#[inline]
pub fn newton(v: f64) -> Force {
    use uom::si::force::newton;
    Force::new::<newton>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn hz(v: f64) -> Frequency {
    use uom::si::frequency::hertz;
    Frequency::new::<hertz>(v)
}

#[inline]
pub fn unitless(v: f64) -> Ratio {
    use uom::si::ratio::ratio;
    Ratio::new::<ratio>(v)
}

pub mod constants {
    /// Celsius zero point on the kelvin scale.
    pub const T0_C_IN_K: f64 = 273.15;
}

/// Raw-f64 Celsius→Kelvin, for solver-side math that stays out of uom.
#[inline]
pub fn celsius_to_kelvin(t_c: f64) -> f64 {
    t_c + constants::T0_C_IN_K
}

/// Raw-f64 Kelvin→Celsius.
#[inline]
pub fn kelvin_to_celsius(t_k: f64) -> f64 {
    t_k - constants::T0_C_IN_K
}

#[cfg(test)]
mod tests {
    use super::*;
    use uom::si::thermodynamic_temperature::kelvin;

    #[test]
    fn constructors_smoke() {
        let _v = volt(5.0);
        let _i = amp(0.1);
        let _r = ohm(1_000.0);
        let _c = farad(1e-6);
        let _t = k(300.0);
        let _p = watt(80.0);
        let _f = newton(2.5);
        let _l = m(0.01);
        let _dt = s(0.1);
        let _fr = hz(50.0);
        let _u = unitless(0.5);
    }

    #[test]
    fn celsius_offset_round_trip() {
        let t = celsius(25.0);
        assert!((t.get::<kelvin>() - 298.15).abs() < 1e-9);
        assert!((celsius_to_kelvin(25.0) - 298.15).abs() < 1e-12);
        assert!((kelvin_to_celsius(298.15) - 25.0).abs() < 1e-12);
    }
}
