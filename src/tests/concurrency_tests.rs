use crate::config::ServiceConfig;
use crate::digest::DigestValue;
use crate::error::TcgError;
use crate::log::record::MeasurementRecord;
use crate::log::replay::replay_log;
use crate::service::LOG_ONLY;
use crate::tests::{service, service_with};
use crate::types::algorithm::AlgorithmId;
use crate::types::id::{EventNumber, EventType, PcrIndex, PhysicalAddress};
use std::collections::BTreeSet;
use std::vec::Vec;

const THREADS: u32 = 4;
const PER_THREAD: u32 = 25;

#[test]
fn test_concurrent_measurements_replay() {
    let (svc, sim) = service();

    std::thread::scope(|s| {
        for t in 0..THREADS {
            let svc = &svc;
            s.spawn(move || {
                for i in 0..PER_THREAD {
                    // Two threads share each register.
                    let template = MeasurementRecord::template(PcrIndex(t % 2), EventType::EV_POST_CODE, vec![t as u8, i as u8]);
                    let payload = [t as u8, i as u8, 0xEE];
                    svc.hash_log_extend_event(Some(&payload[..]), AlgorithmId::SHA1, &template)
                        .unwrap();
                }
            });
        }
    });

    let total = THREADS * PER_THREAD;
    assert_eq!(svc.with_event_log(|log| log.len()), total);

    let banks = svc.with_event_log(replay_log).unwrap();
    let mismatches = banks.verify(|pcr, alg| sim.pcr(pcr, alg));
    assert!(mismatches.is_empty(), "{:?}", mismatches);
}

#[test]
fn test_concurrent_mixed_calls_get_unique_numbers() {
    let (svc, sim) = service();
    let note = MeasurementRecord::new(
        PcrIndex(0),
        EventType::EV_NO_ACTION,
        DigestValue::zero(AlgorithmId::SHA1).unwrap(),
        b"marker".to_vec(),
    );

    let numbers: Vec<EventNumber> = std::thread::scope(|s| {
        let mut handles = Vec::new();
        for t in 0..THREADS {
            let svc = &svc;
            let note = &note;
            handles.push(s.spawn(move || {
                let mut seen = Vec::new();
                for i in 0..PER_THREAD {
                    if (t + i) % 2 == 0 {
                        seen.push(svc.log_event(note, LOG_ONLY).unwrap());
                    } else {
                        let template = MeasurementRecord::template(PcrIndex(7), EventType::EV_ACTION, Vec::new());
                        let outcome = svc
                            .hash_log_extend_event(Some(b"step"), AlgorithmId::SHA1, &template)
                            .unwrap();
                        seen.push(outcome.event_number);
                    }
                }
                seen
            }));
        }
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let unique: BTreeSet<u32> = numbers.iter().map(|n| n.0).collect();
    assert_eq!(unique.len() as u32, THREADS * PER_THREAD);
    assert_eq!(unique.iter().next_back(), Some(&(THREADS * PER_THREAD - 1)));

    let banks = svc.with_event_log(replay_log).unwrap();
    assert!(banks.verify(|pcr, alg| sim.pcr(pcr, alg)).is_empty());
}

#[test]
fn test_concurrent_log_event_fills_log_cleanly() {
    // 42-byte entries: eleven fit, the rest must fail whole.
    let config = ServiceConfig::default().with_log_region(PhysicalAddress(0x4000), 500);
    let (svc, _sim) = service_with(config);
    let note = MeasurementRecord::new(
        PcrIndex(1),
        EventType::EV_NO_ACTION,
        DigestValue::zero(AlgorithmId::SHA1).unwrap(),
        b"marker".to_vec(),
    );

    let results: Vec<Result<EventNumber, TcgError>> = std::thread::scope(|s| {
        let mut handles = Vec::new();
        for _ in 0..THREADS {
            let svc = &svc;
            let note = &note;
            handles.push(s.spawn(move || {
                (0..PER_THREAD)
                    .map(|_| svc.log_event(note, LOG_ONLY))
                    .collect::<Vec<_>>()
            }));
        }
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let ok: BTreeSet<u32> = results
        .iter()
        .filter_map(|r| r.as_ref().ok().map(|n| n.0))
        .collect();
    for failure in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(failure, TcgError::LogFull { extended: false, .. }),
            "{:?}",
            failure
        );
    }
    assert_eq!(ok.len(), 11);
    assert_eq!(results.len() as u32, THREADS * PER_THREAD);

    svc.with_event_log(|log| {
        assert_eq!(log.len() as usize, ok.len());
        assert_eq!(log.entries().count(), ok.len());
        assert_eq!(log.remaining(), 500 - 11 * 42);

        // Contiguous, gap-free and every entry intact.
        let mut expected_offset = 0;
        for (position, record) in log.entries() {
            assert_eq!(position.offset, expected_offset);
            assert!(ok.contains(&position.event_number.0));
            assert_eq!(record, note);
            expected_offset += record.encoded_len();
        }
        assert_eq!(expected_offset, log.as_bytes().len());
    });
}
