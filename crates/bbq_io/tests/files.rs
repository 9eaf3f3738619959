use bbq_core::code::{BbCode, CodeLayout, StabilizerKind, SurfaceCode, SurfaceLayout};
use bbq_core::config::{DefectRate, NoiseKind, SurfaceParams, code_config};
use bbq_core::defect::{DefectPattern, DropoutPolicy};
use bbq_core::emit::{CircuitOptions, syndrome_circuit};
use bbq_core::gf2::BitMatrix;
use bbq_core::noise::NoiseModel;
use bbq_core::schedule::{RoutingTable, build_schedule, tables};
use bbq_io::loader::{load_b8_file, load_b8_matrix, load_dense_matrix, slice_rows};
use bbq_io::parser::load_circuit;
use bbq_io::writer::{
    pack_b8, write_b8_matrix, write_circuit, write_connections, write_dense_matrix, write_partition,
    write_supports,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::tempdir;

#[test]
fn noisy_defect_circuit_survives_a_file_trip() {
    let code = BbCode::new(code_config(1).unwrap().params).unwrap();
    let policy = DropoutPolicy::for_rate(DefectRate::Half).unwrap().unwrap();
    let pattern = DefectPattern::inject(&code, policy, &mut StdRng::seed_from_u64(5));
    let schedule = build_schedule(&code, RoutingTable::for_rate(DefectRate::Half), &pattern).unwrap();
    let opts = CircuitOptions { rounds: 2, x_detectors: true };
    let circuit = syndrome_circuit(&code, &schedule, &pattern, &opts).unwrap();
    let noisy = NoiseModel::new(NoiseKind::Si1000, 0.001)
        .unwrap()
        .apply(&circuit, &code.partition().all());

    let dir = tempdir().unwrap();
    let path = dir.path().join("syndrome.stim");
    write_circuit(&path, &noisy).unwrap();
    let loaded = load_circuit(&path).unwrap();

    assert_eq!(loaded, noisy);
    assert_eq!(loaded.validate().unwrap(), noisy.validate().unwrap());
}

#[test]
fn b8_rows_are_byte_aligned() {
    // 10 columns pad to two bytes per row.
    let m = BitMatrix::from_supports([vec![0, 9], vec![1, 2, 8]], 10);
    assert_eq!(pack_b8(&m), vec![0b0000_0001, 0b0000_0010, 0b0000_0110, 0b0000_0001]);

    let dir = tempdir().unwrap();
    let path = dir.path().join("m.b8");
    write_b8_matrix(&path, &m).unwrap();
    let raw = load_b8_file(&path).unwrap();
    assert_eq!(raw.len(), 32);
    assert_eq!(slice_rows(&raw, 10).len(), 2);
    assert_eq!(load_b8_matrix(&path, 10).unwrap(), m);
    // Three-byte rows do not divide four bytes.
    assert!(load_b8_matrix(&path, 20).is_err());
}

#[test]
fn check_matrices_reload_from_text() {
    let code = BbCode::new(code_config(2).unwrap().params).unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("hx.txt");
    write_dense_matrix(&path, code.hx()).unwrap();
    let loaded = load_dense_matrix(&path).unwrap();
    assert_eq!(&loaded, code.hx());

    std::fs::write(&path, "0110\n011\n").unwrap();
    assert!(load_dense_matrix(&path).is_err());
    std::fs::write(&path, "01x0\n").unwrap();
    assert!(load_dense_matrix(&path).is_err());
}

#[test]
fn supports_and_partition_are_plain_text() {
    let code = BbCode::new(code_config(1).unwrap().params).unwrap();
    let dir = tempdir().unwrap();

    let logicals = dir.path().join("lz.txt");
    let supports = code.css().logical_supports(StabilizerKind::Z);
    write_supports(&logicals, &supports).unwrap();
    let text = std::fs::read_to_string(&logicals).unwrap();
    assert_eq!(text.lines().count(), 12);
    let first: Vec<usize> = text
        .lines()
        .next()
        .unwrap()
        .split_whitespace()
        .map(|t| t.parse().unwrap())
        .collect();
    assert_eq!(first, supports[0]);

    let partition = dir.path().join("qubits.txt");
    write_partition(&partition, code.partition()).unwrap();
    let text = std::fs::read_to_string(&partition).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("data: "));
    assert_eq!(lines[1].split_whitespace().count(), 37);
}

#[test]
fn relayed_patch_lists_relays_and_connections() {
    let code = SurfaceCode::new(SurfaceParams::new(3, 3), SurfaceLayout::Relayed).unwrap();
    let dir = tempdir().unwrap();

    let partition = dir.path().join("qubits.txt");
    write_partition(&partition, code.partition()).unwrap();
    let text = std::fs::read_to_string(&partition).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[3], "relay: 34 44");

    let schedule = build_schedule(&code, &tables::SURFACE_RELAYED, &DefectPattern::intact_for(&code)).unwrap();
    let edges = schedule.couplers(code.partition());
    let path = dir.path().join("connections.txt");
    write_connections(&path, &edges).unwrap();
    let parsed: Vec<(usize, usize)> = std::fs::read_to_string(&path)
        .unwrap()
        .lines()
        .map(|l| {
            let (a, q) = l.split_once(' ').unwrap();
            (a.parse().unwrap(), q.parse().unwrap())
        })
        .collect();
    assert_eq!(parsed, edges);
    assert!(parsed.iter().any(|&(a, _)| a == 34));
}
