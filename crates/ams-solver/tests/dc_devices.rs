//! Operating-point tests exercising the piecewise and multi-domain models.

use ams_core::{amp, celsius, ohm, s, volt, watt};
use ams_models::{OpAmp, Resistor, SolarPanel, SolarPanelParams, Tec, Thermistor, VSource};
use ams_net::{Domain, NetlistBuilder};
use ams_solver::{NewtonConfig, SystemProblem, solve_dc};
use ams_sources::Waveform;

fn panel_params() -> SolarPanelParams {
    SolarPanelParams {
        voc: volt(22.0),
        isc: amp(5.0),
        pmax: watt(80.0),
        vmp: volt(18.0),
        voc_20: volt(20.0),
        isc_20: amp(1.0),
        pmax_20: watt(15.0),
        vmp_20: volt(16.4),
        rleak: ohm(200.0),
    }
}

#[test]
fn solar_panel_finds_the_load_line() {
    // 1 ohm load pulls the panel far below the knee: the operating point
    // sits on the short-circuit plateau near isc
    let mut nb = NetlistBuilder::new();
    let gnd = nb.ground(Domain::Electrical);
    let out = nb.node(Domain::Electrical, "out");
    let pv = nb.instance("PV1");
    let b_pv = nb.branch(pv, Domain::Electrical, out, gnd);
    let rl = nb.instance("RL");
    nb.branch(rl, Domain::Electrical, out, gnd);
    let net = nb.build().unwrap();

    let mut problem = SystemProblem::new(&net);
    let panel = SolarPanel::new("PV1", &panel_params(), 1.0).unwrap();
    problem.add_model(pv, Box::new(panel)).unwrap();
    problem
        .add_model(rl, Box::new(Resistor::new("RL", ohm(1.0)).unwrap()))
        .unwrap();

    let solution = solve_dc(&problem, &NewtonConfig::default()).unwrap();

    // v = i * 1 ohm and i = isc * (1 - g_leak * v / voc):
    // v = 5 / (1 + 5 * 0.022 / 22 * 22 / 22) -> about 4.975 V
    let u_out = problem.unknowns().node_unknown(out).unwrap();
    let v = solution.x[u_out];
    assert!(
        (v - 4.975).abs() < 0.01,
        "load-line voltage is {v} V, expected about 4.975 V"
    );
    // Panel branch sinks the generated current
    let u_ipv = problem.unknowns().through_unknown(b_pv);
    assert!((solution.x[u_ipv] + v).abs() < 1e-6);

    // Plateau segment committed: every breakpoint still ahead
    let pv_modes = &solution.modes[pv.index() as usize];
    assert_eq!(pv_modes.as_slice(), &[true, true, true]);

    // Panel observable reports the delivered power
    let drives = problem.initial_drives().unwrap();
    let inputs = ams_solver::EvalInputs {
        t: 0.0,
        inv_dt: 0.0,
        quiescent: true,
        x_prev: &solution.x,
        modes: &solution.modes,
        drives: &drives,
    };
    let observables = problem.observables_at(&solution.x, &inputs).unwrap();
    let power = observables
        .iter()
        .find(|(name, _)| name == "PV1.power_output")
        .map(|(_, p)| *p)
        .unwrap();
    assert!((power - v * v).abs() < 1e-6);
}

#[test]
fn thermistor_tracks_a_pinned_case_temperature() {
    // Electrical: 5 V across the thermistor. Thermal: the case node is
    // held at 50 C by a temperature source, so the NTC resistance drops
    // well below its 25 C value and the dissipated power flows into the
    // temperature source.
    let mut nb = NetlistBuilder::new();
    let gnd_e = nb.ground(Domain::Electrical);
    let gnd_t = nb.ground(Domain::Thermal);
    let el = nb.node(Domain::Electrical, "el");
    let case = nb.node(Domain::Thermal, "case");
    let v1 = nb.instance("V1");
    nb.branch(v1, Domain::Electrical, el, gnd_e);
    let th = nb.instance("TH1");
    let b_el = nb.branch(th, Domain::Electrical, el, gnd_e);
    nb.branch(th, Domain::Thermal, case, gnd_t);
    let vt = nb.instance("VT");
    let b_sink = nb.branch(vt, Domain::Thermal, case, gnd_t);
    let net = nb.build().unwrap();

    let mut problem = SystemProblem::new(&net);
    problem
        .add_model(
            v1,
            Box::new(VSource::electrical("V1", Waveform::constant(5.0).unwrap()).unwrap()),
        )
        .unwrap();
    problem
        .add_model(
            th,
            Box::new(Thermistor::new("TH1", ohm(10_000.0), 3950.0, celsius(25.0)).unwrap()),
        )
        .unwrap();
    let t_case = 273.15 + 50.0;
    problem
        .add_model(
            vt,
            Box::new(
                VSource::new("VT", Domain::Thermal, Waveform::constant(t_case).unwrap()).unwrap(),
            ),
        )
        .unwrap();

    let solution = solve_dc(&problem, &NewtonConfig::default()).unwrap();

    // R(323.15 K) = 10k * exp(3950 * (1/323.15 - 1/298.15)) -> about 3587 ohm
    let expected_i = 5.0 / 3587.0;
    let u_i = problem.unknowns().through_unknown(b_el);
    let i = solution.x[u_i];
    assert!(
        (i - expected_i).abs() / expected_i < 0.01,
        "thermistor current {i} A, expected about {expected_i} A"
    );

    // All dissipated power drains into the temperature source
    let u_q = problem.unknowns().through_unknown(b_sink);
    assert!((solution.x[u_q] - 5.0 * i).abs() < 1e-9);
}

#[test]
fn tec_cools_an_insulated_cold_face() {
    // 2 V across the element, hot face held at 300 K, cold face floating:
    // at equilibrium the pumped heat balances Joule heating and
    // back-conduction, about 35 K below the hot side
    let mut nb = NetlistBuilder::new();
    let gnd_e = nb.ground(Domain::Electrical);
    let gnd_t = nb.ground(Domain::Thermal);
    let el = nb.node(Domain::Electrical, "el");
    let cold = nb.node(Domain::Thermal, "cold");
    let hot = nb.node(Domain::Thermal, "hot");

    let v1 = nb.instance("V1");
    nb.branch(v1, Domain::Electrical, el, gnd_e);
    let tec = nb.instance("TEC1");
    let b_i = nb.branch(tec, Domain::Electrical, el, gnd_e);
    nb.branch(tec, Domain::Thermal, cold, hot);
    let b_dump = nb.branch(tec, Domain::Thermal, gnd_t, hot);
    let vt = nb.instance("VT");
    nb.branch(vt, Domain::Thermal, hot, gnd_t);
    let net = nb.build().unwrap();

    let mut problem = SystemProblem::new(&net);
    problem
        .add_model(
            v1,
            Box::new(VSource::electrical("V1", Waveform::constant(2.0).unwrap()).unwrap()),
        )
        .unwrap();
    problem
        .add_model(tec, Box::new(Tec::new("TEC1", 0.05, ohm(2.0), 0.05).unwrap()))
        .unwrap();
    problem
        .add_model(
            vt,
            Box::new(
                VSource::new("VT", Domain::Thermal, Waveform::constant(300.0).unwrap()).unwrap(),
            ),
        )
        .unwrap();

    let solution = solve_dc(&problem, &NewtonConfig::default()).unwrap();

    // Quadratic balance: delta = 34.71 K, i = 0.1322 A
    let u_cold = problem.unknowns().node_unknown(cold).unwrap();
    let t_cold = solution.x[u_cold];
    assert!(
        (260.0..270.0).contains(&t_cold),
        "insulated cold face at {t_cold} K, expected about 265.3 K"
    );
    let u_i = problem.unknowns().through_unknown(b_i);
    let i = solution.x[u_i];
    assert!((i - 0.1322).abs() < 0.005, "element current {i} A");

    // With nothing pumped, the dump branch carries exactly the electrical
    // power into the hot face
    let u_dump = problem.unknowns().through_unknown(b_dump);
    assert!((solution.x[u_dump] - 2.0 * i).abs() < 1e-6);
}

#[test]
fn open_loop_opamp_saturates_through_mode_refresh() {
    // The first solve under the linear mode lands far above the rail; the
    // refreshed guards commit SatHigh and the re-solve pins the output
    let mut nb = NetlistBuilder::new();
    let gnd = nb.ground(Domain::Electrical);
    let inp = nb.node(Domain::Electrical, "inp");
    let inn = nb.node(Domain::Electrical, "inn");
    let out = nb.node(Domain::Electrical, "out");

    let v1 = nb.instance("V1");
    nb.branch(v1, Domain::Electrical, inp, gnd);
    let rb = nb.instance("RB");
    nb.branch(rb, Domain::Electrical, inn, gnd);
    let rl = nb.instance("RL");
    nb.branch(rl, Domain::Electrical, out, gnd);
    let u1 = nb.instance("U1");
    nb.branch(u1, Domain::Electrical, inp, gnd);
    nb.branch(u1, Domain::Electrical, inn, gnd);
    nb.branch(u1, Domain::Electrical, out, gnd);
    let net = nb.build().unwrap();

    let mut problem = SystemProblem::new(&net);
    problem
        .add_model(
            v1,
            Box::new(VSource::electrical("V1", Waveform::constant(0.5).unwrap()).unwrap()),
        )
        .unwrap();
    problem
        .add_model(rb, Box::new(Resistor::new("RB", ohm(1000.0)).unwrap()))
        .unwrap();
    problem
        .add_model(rl, Box::new(Resistor::new("RL", ohm(1000.0)).unwrap()))
        .unwrap();
    problem
        .add_model(
            u1,
            Box::new(
                OpAmp::new("U1", 1e5, volt(-1.0), volt(1.0), s(1e-4), ohm(0.0)).unwrap(),
            ),
        )
        .unwrap();

    let solution = solve_dc(&problem, &NewtonConfig::default()).unwrap();

    let u_out = problem.unknowns().node_unknown(out).unwrap();
    assert!(
        (solution.x[u_out] - 1.0).abs() < 1e-9,
        "saturated output at {} V",
        solution.x[u_out]
    );
    let u1_modes = &solution.modes[u1.index() as usize];
    assert_eq!(u1_modes.as_slice(), &[true, false]);
}

#[test]
fn opamp_follower_sits_just_below_the_input() {
    // Unity follower: output wired back to the inverting input; the finite
    // open-loop gain leaves a gain/(1+gain) error
    let mut nb = NetlistBuilder::new();
    let gnd = nb.ground(Domain::Electrical);
    let inp = nb.node(Domain::Electrical, "inp");
    let out = nb.node(Domain::Electrical, "out");

    let v1 = nb.instance("V1");
    nb.branch(v1, Domain::Electrical, inp, gnd);
    let rl = nb.instance("RL");
    nb.branch(rl, Domain::Electrical, out, gnd);
    let u1 = nb.instance("U1");
    nb.branch(u1, Domain::Electrical, inp, gnd);
    nb.branch(u1, Domain::Electrical, out, gnd);
    nb.branch(u1, Domain::Electrical, out, gnd);
    let net = nb.build().unwrap();

    let mut problem = SystemProblem::new(&net);
    problem
        .add_model(
            v1,
            Box::new(VSource::electrical("V1", Waveform::constant(0.5).unwrap()).unwrap()),
        )
        .unwrap();
    problem
        .add_model(rl, Box::new(Resistor::new("RL", ohm(10_000.0)).unwrap()))
        .unwrap();
    problem
        .add_model(
            u1,
            Box::new(
                OpAmp::new("U1", 1e5, volt(-10.0), volt(10.0), s(1e-4), ohm(0.0)).unwrap(),
            ),
        )
        .unwrap();

    let solution = solve_dc(&problem, &NewtonConfig::default()).unwrap();

    let u_out = problem.unknowns().node_unknown(out).unwrap();
    let v_out = solution.x[u_out];
    let expected = 0.5 * 1e5 / (1.0 + 1e5);
    assert!(
        (v_out - expected).abs() < 1e-8,
        "follower output {v_out} V, expected {expected} V"
    );
    assert!(v_out < 0.5);
}
