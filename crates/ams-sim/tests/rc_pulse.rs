//! RC charging step driven by a pulse source.

use ams_core::{farad, ohm};
use ams_models::{Capacitor, Resistor, VSource};
use ams_net::{Domain, NetlistBuilder};
use ams_solver::{NewtonConfig, SystemProblem, solve_dc};
use ams_sim::{TransientOptions, run_transient};
use ams_sources::Waveform;

#[test]
fn rc_charges_one_time_constant_past_the_pulse_edge() {
    // 1 kOhm into 1 uF, tau = 1 ms; the pulse steps 0 -> 1 V at t = 1 ms
    let mut nb = NetlistBuilder::new();
    let gnd = nb.ground(Domain::Electrical);
    let inp = nb.node(Domain::Electrical, "in");
    let out = nb.node(Domain::Electrical, "out");
    let v1 = nb.instance("V1");
    nb.branch(v1, Domain::Electrical, inp, gnd);
    let r1 = nb.instance("R1");
    nb.branch(r1, Domain::Electrical, inp, out);
    let c1 = nb.instance("C1");
    nb.branch(c1, Domain::Electrical, out, gnd);
    let net = nb.build().unwrap();

    let mut problem = SystemProblem::new(&net);
    problem
        .add_model(
            v1,
            Box::new(
                VSource::electrical(
                    "V1",
                    Waveform::pulse(0.0, 1.0, 1e-3, 0.0, 1.0, 0.0, 0.0).unwrap(),
                )
                .unwrap(),
            ),
        )
        .unwrap();
    problem
        .add_model(r1, Box::new(Resistor::new("R1", ohm(1000.0)).unwrap()))
        .unwrap();
    problem
        .add_model(c1, Box::new(Capacitor::new("C1", farad(1e-6)).unwrap()))
        .unwrap();

    let dc = solve_dc(&problem, &NewtonConfig::default()).unwrap();
    let u_out = problem.unknowns().node_unknown(out).unwrap();
    assert!(dc.x[u_out].abs() < 1e-9, "capacitor starts discharged");

    let opts = TransientOptions {
        dt: 5e-5,
        t_end: 2e-3,
        ..TransientOptions::default()
    };
    let record = run_transient(&mut problem, &dc, &opts).unwrap();

    // The engine lands a step exactly on the pulse edge
    assert!(
        record.t.iter().any(|&t| t == 1e-3),
        "no sample landed on the pulse corner at 1 ms"
    );

    // Before the edge the output holds at zero
    let before = record
        .t
        .iter()
        .position(|&t| t >= 9e-4)
        .expect("sample before the edge");
    assert!(record.states[before][u_out].abs() < 1e-6);

    // One time constant after the edge: v = 1 - exp(-1), within the
    // first-order truncation of the fixed step
    let last = record.states.last().unwrap();
    let v_end = last[u_out];
    assert!(
        (v_end - 0.632).abs() < 0.02,
        "v(2 ms) = {v_end}, expected about 0.632"
    );
    assert_eq!(record.t.last().copied(), Some(2e-3));

    // Stored energy observable tracks 0.5 C v^2
    let energy = record
        .observable_series("C1.energy_stored")
        .expect("capacitor reports energy_stored");
    let (_, e_end) = energy.last().copied().unwrap();
    assert!((e_end - 0.5 * 1e-6 * v_end * v_end).abs() < 1e-12);
}
