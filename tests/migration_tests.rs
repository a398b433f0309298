use circuit_islands::{
    Communicator, FrameBuffer, Genome, GenomePerf, Island, IslandAlgorithm, Population,
    SoloWorld, ThreadWorld, TruthTable,
};
use std::thread;

// --- Shared fixtures ---

fn xor_table() -> TruthTable {
    TruthTable::parse("iCount 2; oCount 1; radix 2; pattern 00:0, 01:1, 10:1, 11:0;")
        .expect("xor table parses")
}

fn bit_error_fitness(perf: &GenomePerf) -> u32 {
    perf.bit_errors
}

fn constant_fitness(_perf: &GenomePerf) -> u32 {
    7
}

#[test]
fn point_to_point_messages_match_on_source_and_tag() {
    let endpoints = ThreadWorld::create(2);
    let handles: Vec<_> = endpoints
        .into_iter()
        .map(|comm| {
            thread::spawn(move || {
                if comm.rank() == 0 {
                    comm.send(1, 5, &[0xAA]);
                    comm.send(1, 6, &[0xBB, 0xBC]);
                } else {
                    // Receive out of arrival order; matching is by tag.
                    assert_eq!(comm.probe(0, 6), 2);
                    assert_eq!(comm.recv(0, 6), vec![0xBB, 0xBC]);
                    assert_eq!(comm.probe(0, 5), 1);
                    assert_eq!(comm.recv(0, 5), vec![0xAA]);
                }
                comm.barrier();
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("rank thread");
    }
}

#[test]
fn all_gather_concatenates_in_rank_order() {
    let endpoints = ThreadWorld::create(3);
    let handles: Vec<_> = endpoints
        .into_iter()
        .map(|comm| {
            thread::spawn(move || {
                let rank = comm.rank();
                // Varied per-rank contribution lengths.
                let local: Vec<u32> = (0..=rank).map(|i| rank * 10 + i).collect();
                let gathered = comm.all_gather_v(&local);
                assert_eq!(gathered, vec![0, 10, 11, 20, 21, 22]);
                // A second gather reuses the same slots.
                let again = comm.all_gather_v(&[rank]);
                assert_eq!(again, vec![0, 1, 2]);
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("rank thread");
    }
}

#[test]
fn frame_buffer_round_trips_genomes_over_the_wire() {
    let mut algorithm = IslandAlgorithm::new(2, 32);
    algorithm.set_seed(17);
    let genome = Genome::random(32, &mut algorithm);
    let frames = genome.frames();

    let endpoints = ThreadWorld::create(2);
    let handles: Vec<_> = endpoints
        .into_iter()
        .map(|comm| {
            let frames = frames.clone();
            thread::spawn(move || {
                if comm.rank() == 0 {
                    let mut buffer = FrameBuffer::new(32);
                    let mut algorithm = IslandAlgorithm::new(2, 32);
                    algorithm.set_seed(17);
                    buffer.append_genome(&Genome::random(32, &mut algorithm));
                    buffer.transmit(&comm, 1, 3);
                } else {
                    let mut buffer = FrameBuffer::new(32);
                    buffer.receive(&comm, 0, 3);
                    assert_eq!(buffer.frames(), frames.as_slice());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("rank thread");
    }
}

#[test]
fn remote_crossover_reproduces_the_source_genomes() {
    let endpoints = ThreadWorld::create(2);
    let handles: Vec<_> = endpoints
        .into_iter()
        .map(|comm| {
            thread::spawn(move || {
                let table = xor_table();
                let mut islands: Vec<Island> = (0..2u32)
                    .map(|domain| {
                        let mut algorithm = IslandAlgorithm::new(4, 16);
                        algorithm.set_seed(100 + domain as u64);
                        Island::new(algorithm)
                    })
                    .collect();
                for (domain, island) in islands.iter_mut().enumerate() {
                    island.initialise(&table, bit_error_fitness, domain as u32, &comm);
                }

                // Both source streams drawn from island 0, so the
                // destination becomes a byte copy of it.
                Island::crossover(&mut islands, 1, 0, 0, &[], &comm);
                comm.barrier();

                if comm.rank() == 1 {
                    let mut reference = IslandAlgorithm::new(4, 16);
                    reference.set_seed(100);
                    for slot in 0..4 {
                        let expected = Genome::random(16, &mut reference);
                        assert_eq!(
                            islands[1].genomes()[slot].frames(),
                            expected.frames(),
                            "slot {slot} differs from the source"
                        );
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("rank thread");
    }
}

#[test]
fn local_crossover_stripes_between_two_sources() {
    let table = xor_table();
    let mut islands: Vec<Island> = (0..3u32)
        .map(|domain| {
            let mut algorithm = IslandAlgorithm::new(4, 16);
            algorithm.set_seed(200 + domain as u64);
            Island::new(algorithm)
        })
        .collect();
    for (domain, island) in islands.iter_mut().enumerate() {
        island.initialise(&table, bit_error_fitness, domain as u32, &SoloWorld);
    }

    let src1_frames: Vec<_> = islands[0].genomes().iter().map(|g| g.frames()).collect();
    let src2_frames: Vec<_> = islands[1].genomes().iter().map(|g| g.frames()).collect();

    Island::crossover(&mut islands, 2, 0, 1, &[], &SoloWorld);

    for slot in 0..4 {
        let expected = if slot % 2 == 1 {
            &src1_frames[slot]
        } else {
            &src2_frames[slot]
        };
        assert_eq!(
            &islands[2].genomes()[slot].frames(),
            expected,
            "slot {slot} drawn from the wrong source"
        );
    }
}

#[test]
fn global_rank_map_agrees_on_every_rank() {
    let endpoints = ThreadWorld::create(2);
    let handles: Vec<_> = endpoints
        .into_iter()
        .map(|comm| {
            thread::spawn(move || {
                let table = xor_table();
                let mut population = Population::new(4, 4, 16, comm);
                population.algorithm_mut().set_generations_per_cycle(4);
                population.initialise(&table, bit_error_fitness);
                population.iterate(&table, bit_error_fitness);
                population
                    .rank_map()
                    .iter()
                    .map(|entry| {
                        (
                            population.island(entry.island).domain_index(),
                            entry.fitness,
                        )
                    })
                    .collect::<Vec<(u32, u32)>>()
            })
        })
        .collect();

    let views: Vec<Vec<(u32, u32)>> = handles
        .into_iter()
        .map(|handle| handle.join().expect("rank thread"))
        .collect();
    assert_eq!(views[0].len(), 4);
    assert_eq!(views[0], views[1]);
}

#[test]
fn global_ties_order_by_domain_index() {
    let table = xor_table();
    let mut population = Population::new(4, 4, 16, SoloWorld);
    population.algorithm_mut().set_generations_per_cycle(1);
    population.initialise(&table, constant_fitness);

    let domains: Vec<u32> = population
        .rank_map()
        .iter()
        .map(|entry| population.island(entry.island).domain_index())
        .collect();
    assert_eq!(domains, vec![0, 1, 2, 3]);
}

#[test]
fn best_genome_lands_in_a_file() {
    let table = xor_table();
    let mut population = Population::new(2, 4, 16, SoloWorld);
    population.algorithm_mut().set_generations_per_cycle(2);
    population.initialise(&table, bit_error_fitness);
    population.iterate(&table, bit_error_fitness);

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("best.op");
    population.write_best_genome(&path).expect("genome writes");

    let text = std::fs::read_to_string(&path).expect("file reads");
    assert_eq!(text.lines().count(), 16);
    assert!(text.lines().next().expect("first line").starts_with("0:"));
}
