use circuit_islands::{
    gene, Gene, GeneFrame, GeneFunction, Genome, IslandAlgorithm, TruthTable,
};

// --- Shared fixtures ---

fn xor_table() -> TruthTable {
    TruthTable::parse("iCount 2; oCount 1; radix 2; pattern 00:0, 01:1, 10:1, 11:0;")
        .expect("xor table parses")
}

fn frame(function: GeneFunction, a_index: u16, b_index: u16) -> GeneFrame {
    GeneFrame {
        function,
        a_index,
        b_index,
    }
}

#[test]
fn gene_functions_compute_bit_parallel() {
    let a = 0xF0F0_AAAA_5555_0F0Fu64;
    let b = 0xCCCC_3333_FF00_00FFu64;
    let cases = [
        (GeneFunction::Nop, a),
        (GeneFunction::Not, !a),
        (GeneFunction::And, a & b),
        (GeneFunction::Nand, !(a & b)),
        (GeneFunction::Or, a | b),
        (GeneFunction::Nor, !(a | b)),
        (GeneFunction::Xor, a ^ b),
        (GeneFunction::Xnor, !(a ^ b)),
    ];
    for (function, expected) in cases {
        let gene = Gene::from_frame(frame(function, 0, 0));
        assert_eq!(gene.compute_output(a, b), expected, "{function}");
    }
}

#[test]
fn nop_and_not_never_consult_b() {
    // The b edge points far outside the gene slice; evaluation must
    // not follow it.
    let value = 0xDEAD_BEEF_0123_4567u64;
    for (function, expected) in [(GeneFunction::Nop, value), (GeneFunction::Not, !value)] {
        let mut genes = vec![
            Gene::from_frame(frame(GeneFunction::Nop, 0, 0)),
            Gene::from_frame(frame(function, 0, 999)),
        ];
        genes[0].override_buffer(value);
        assert_eq!(gene::output(&mut genes, 1), expected, "{function}");
    }
}

#[test]
fn valid_buffers_short_circuit_evaluation() {
    let mut genes = vec![
        Gene::from_frame(frame(GeneFunction::Nop, 0, 0)),
        Gene::from_frame(frame(GeneFunction::And, 0, 0)),
    ];
    genes[0].override_buffer(0xFFFF_FFFF_FFFF_FFFF);
    genes[1].override_buffer(42);
    // The stale buffer wins over recomputation.
    assert_eq!(gene::output(&mut genes, 1), 42);
}

#[test]
fn bit_errors_count_masked_differences() {
    let table = xor_table();

    // Inputs at slots 0 and 1, XOR at 2, output tap mirrors it.
    let mut exact = Genome::from_frames(&[
        frame(GeneFunction::Nop, 0, 0),
        frame(GeneFunction::Nop, 0, 0),
        frame(GeneFunction::Xor, 0, 1),
        frame(GeneFunction::Nop, 2, 0),
    ]);
    assert_eq!(exact.perf_data(&table).bit_errors, 0);

    // AND differs from XOR on patterns 01, 10 and 11.
    let mut wrong = Genome::from_frames(&[
        frame(GeneFunction::Nop, 0, 0),
        frame(GeneFunction::Nop, 0, 0),
        frame(GeneFunction::And, 0, 1),
        frame(GeneFunction::Nop, 2, 0),
    ]);
    assert_eq!(wrong.perf_data(&table).bit_errors, 3);
}

#[test]
fn active_genes_and_gate_delays_follow_the_output_cone() {
    let table = xor_table();
    let mut genome = Genome::from_frames(&[
        frame(GeneFunction::Nop, 0, 0),
        frame(GeneFunction::Nop, 0, 0),
        frame(GeneFunction::Xor, 0, 1),
        frame(GeneFunction::Nop, 2, 0),
    ]);
    let perf = genome.perf_data(&table);
    // The XOR and the tap are reached; the input sinks don't count.
    assert_eq!(perf.active_genes, 2);
    // Tap sits one gate behind the XOR, which is one behind the inputs.
    assert_eq!(perf.max_gate_delays, 2);
}

#[test]
fn function_counts_cover_every_gene() {
    let table = xor_table();
    let mut genome = Genome::from_frames(&[
        frame(GeneFunction::Nop, 0, 0),
        frame(GeneFunction::Not, 0, 0),
        frame(GeneFunction::Xor, 0, 1),
        frame(GeneFunction::Xor, 2, 1),
    ]);
    let perf = genome.perf_data(&table);
    assert_eq!(perf.function_count(GeneFunction::Nop), 1);
    assert_eq!(perf.function_count(GeneFunction::Not), 1);
    assert_eq!(perf.function_count(GeneFunction::Xor), 2);
    assert_eq!(perf.function_count(GeneFunction::And), 0);
}

#[test]
fn mutation_resets_genome_age() {
    let table = xor_table();
    let mut algorithm = IslandAlgorithm::new(4, 16);
    algorithm.set_seed(3);
    let mut genome = Genome::random(16, &mut algorithm);

    genome.increment_age();
    genome.increment_age();
    genome.increment_age();
    assert_eq!(genome.perf_data(&table).genome_age, 3);

    genome.mutate(&mut algorithm);
    assert_eq!(genome.perf_data(&table).genome_age, 0);
}

#[test]
fn copy_from_transfers_the_circuit_and_restarts_age() {
    let table = xor_table();
    let mut algorithm = IslandAlgorithm::new(4, 16);
    algorithm.set_seed(5);
    let mut original = Genome::random(16, &mut algorithm);
    let mut copy = Genome::random(16, &mut algorithm);

    original.increment_age();
    copy.copy_from(&original);

    assert_eq!(copy.frames(), original.frames());
    assert_eq!(copy.perf_data(&table).genome_age, 0);
    assert_eq!(
        copy.perf_data(&table).bit_errors,
        original.perf_data(&table).bit_errors
    );
}

#[test]
fn edges_stay_backward_under_a_million_mutations() {
    let mut algorithm = IslandAlgorithm::new(4, 1024);
    algorithm.set_seed(9);
    let mut genome = Genome::random(1024, &mut algorithm);

    for _ in 0..1_000_000 {
        genome.mutate(&mut algorithm);
    }

    for (i, gene) in genome.genes().iter().enumerate().skip(1) {
        assert!((gene.a_index() as usize) < i, "a edge forward at gene {i}");
        assert!((gene.b_index() as usize) < i, "b edge forward at gene {i}");
    }
}

#[test]
fn wire_frames_round_trip_byte_exactly() {
    let mut algorithm = IslandAlgorithm::new(4, 64);
    algorithm.set_seed(21);
    let genome = Genome::random(64, &mut algorithm);

    let frames = genome.frames();
    let decoded: Vec<GeneFrame> = frames
        .iter()
        .map(|f| GeneFrame::decode(&f.encode()).expect("known function byte"))
        .collect();
    assert_eq!(decoded, frames);

    let rebuilt = Genome::from_frames(&frames);
    assert_eq!(rebuilt.frames(), frames);
}

#[test]
fn unknown_function_bytes_are_rejected() {
    assert!(GeneFrame::decode(&[0x08, 0, 0, 0, 0]).is_none());
    assert!(GeneFrame::decode(&[0xFF, 0, 0, 0, 0]).is_none());
    assert!(GeneFunction::from_byte(7).is_some());
    assert!(GeneFunction::from_byte(8).is_none());
}
