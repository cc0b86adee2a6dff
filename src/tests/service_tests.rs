use crate::capability::BootServiceCapability;
use crate::command::{self, parse_response};
use crate::config::{ServiceConfig, DEFAULT_LOG_BASE};
use crate::digest::{extend_value, DigestValue};
use crate::error::{DeviceFault, TcgError, TransportError};
use crate::log::record::MeasurementRecord;
use crate::service::LOG_ONLY;
use crate::sim::SimulatedTpm;
use crate::tests::{all_algorithms, service, service_with};
use crate::types::algorithm::{AlgorithmBitmap, AlgorithmId};
use crate::types::id::{EventNumber, EventType, PcrIndex, PhysicalAddress};
use crate::TcgService;
use std::vec::Vec;

fn note(pcr: u32) -> MeasurementRecord {
    MeasurementRecord::new(
        PcrIndex(pcr),
        EventType::EV_NO_ACTION,
        DigestValue::zero(AlgorithmId::SHA1).unwrap(),
        b"informational".to_vec(),
    )
}

// --- StatusCheck ---

#[test]
fn test_status_check_reports_capability() {
    let (svc, _sim) = service();
    let report = svc.status_check(BootServiceCapability::ENCODED_SIZE as u8).unwrap();

    assert_eq!(report.capability.size as usize, BootServiceCapability::ENCODED_SIZE);
    assert_eq!(report.capability.hash_algorithm_bitmap, AlgorithmBitmap::SHA1);
    assert!(report.capability.tpm_present);
    assert!(!report.capability.tpm_deactivated);
    assert_eq!(report.feature_flags, 0);
    assert_eq!(report.event_log_location, DEFAULT_LOG_BASE);
    assert_eq!(report.event_log_last_entry, None);
}

#[test]
fn test_status_check_is_idempotent() {
    let (svc, sim) = service();
    let first = svc.status_check(64).unwrap();
    let second = svc.status_check(64).unwrap();
    assert_eq!(first, second);
    assert_eq!(sim.commands_seen(), 0);
}

#[test]
fn test_status_check_tracks_last_entry() {
    let (svc, _sim) = service();
    let template = MeasurementRecord::template(PcrIndex(0), EventType::EV_POST_CODE, Vec::new());
    let outcome = svc
        .hash_log_extend_event(Some(b"first"), AlgorithmId::SHA1, &template)
        .unwrap();
    assert_eq!(outcome.last_entry, DEFAULT_LOG_BASE);

    let outcome = svc
        .hash_log_extend_event(Some(b"second"), AlgorithmId::SHA1, &template)
        .unwrap();
    let report = svc.status_check(12).unwrap();
    assert_eq!(report.event_log_last_entry, Some(outcome.last_entry));
    assert_eq!(outcome.last_entry.0, DEFAULT_LOG_BASE.0 + 36);
}

#[test]
fn test_status_check_destination_size() {
    let (svc, _sim) = service();
    assert_eq!(svc.status_check(0), Err(TcgError::BufferTooSmall { required: 12 }));
    assert_eq!(svc.status_check(11), Err(TcgError::BufferTooSmall { required: 12 }));
    assert!(svc.status_check(12).is_ok());
}

#[test]
fn test_status_check_device_states() {
    let svc = TcgService::new(ServiceConfig::default(), SimulatedTpm::absent()).unwrap();
    let report = svc.status_check(12).unwrap();
    assert!(!report.capability.tpm_present);
    assert!(!report.capability.tpm_deactivated);

    let (svc, sim) = service();
    sim.set_deactivated(true);
    let report = svc.status_check(12).unwrap();
    assert!(report.capability.tpm_present);
    assert!(report.capability.tpm_deactivated);
}

// --- HashAll ---

#[test]
fn test_hash_all_known_vectors() {
    let (svc, _sim) = service_with(all_algorithms());
    let cases = [
        (AlgorithmId::SHA1, "da39a3ee5e6b4b0d3255bfef95601890afd80709"),
        (
            AlgorithmId::SHA256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        ),
        (
            AlgorithmId::SHA384,
            "38b060a751ac96384cd9327eb1b1e36a21fdb71114be07434c0cc7bf63f6e1da274edebfe76f65fbd51ad2f14898b95b",
        ),
    ];
    for (algorithm, expected) in cases {
        let digest = svc.hash_all(&[], algorithm, 64).unwrap();
        assert_eq!(hex::encode(digest.as_bytes()), expected);
    }

    let abc = svc.hash_all(b"abc", AlgorithmId::SHA1, 20).unwrap();
    assert_eq!(hex::encode(abc.as_bytes()), "a9993e364706816aba3e25717850c26c9cd0d89d");
}

#[test]
fn test_hash_all_capacity_negotiation() {
    let (svc, _sim) = service();
    assert_eq!(
        svc.hash_all(b"data", AlgorithmId::SHA1, 10),
        Err(TcgError::BufferTooSmall { required: 20 })
    );
    assert!(svc.hash_all(b"data", AlgorithmId::SHA1, 20).is_ok());
    // Zero capacity asks for the size.
    assert_eq!(
        svc.hash_all(b"data", AlgorithmId::SHA1, 0),
        Err(TcgError::BufferTooSmall { required: 20 })
    );
}

#[test]
fn test_hash_all_algorithm_checks() {
    let (svc, _sim) = service();
    assert_eq!(
        svc.hash_all(b"x", AlgorithmId::SHA256, 64),
        Err(TcgError::UnsupportedAlgorithm(AlgorithmId::SHA256))
    );
    assert!(matches!(
        svc.hash_all(b"x", AlgorithmId(0), 64),
        Err(TcgError::InvalidParameter(_))
    ));
    assert!(matches!(
        svc.hash_all(b"x", AlgorithmId(0b11), 64),
        Err(TcgError::InvalidParameter(_))
    ));
}

// --- LogEvent ---

#[test]
fn test_log_event_appends_without_extend() {
    let (svc, sim) = service();
    assert_eq!(svc.log_event(&note(0), LOG_ONLY), Ok(EventNumber(0)));
    assert_eq!(svc.log_event(&note(1), LOG_ONLY), Ok(EventNumber(1)));

    assert_eq!(sim.commands_seen(), 0);
    assert_eq!(sim.pcr(PcrIndex(0), AlgorithmId::SHA1), Some(vec![0u8; 20]));
    assert_eq!(svc.with_event_log(|log| log.get(EventNumber(1))), Some(note(1)));
}

#[test]
fn test_log_event_rejects_bad_input() {
    let (svc, _sim) = service();
    let invalid = |r: Result<EventNumber, TcgError>| matches!(r, Err(TcgError::InvalidParameter(_)));

    assert!(invalid(svc.log_event(&note(0), 0)));
    assert!(invalid(svc.log_event(&note(0), LOG_ONLY | 0x2)));
    assert!(invalid(svc.log_event(&note(24), LOG_ONLY)));

    let measured = MeasurementRecord::new(
        PcrIndex(0),
        EventType::EV_POST_CODE,
        DigestValue::zero(AlgorithmId::SHA1).unwrap(),
        Vec::new(),
    );
    assert!(invalid(svc.log_event(&measured, LOG_ONLY)));

    let sha256 = MeasurementRecord::new(
        PcrIndex(0),
        EventType::EV_NO_ACTION,
        DigestValue::zero(AlgorithmId::SHA256).unwrap(),
        Vec::new(),
    );
    assert!(invalid(svc.log_event(&sha256, LOG_ONLY)));

    assert_eq!(svc.with_event_log(|log| log.len()), 0);
}

#[test]
fn test_log_event_refuses_events_extended_elsewhere() {
    let (svc, sim) = service();
    let digest = svc.hash_all(b"separator", AlgorithmId::SHA1, 20).unwrap();
    let extend = command::extend_command(PcrIndex(4), digest.as_bytes());
    svc.pass_through_to_tpm(&extend, 64).unwrap();
    assert_ne!(sim.pcr(PcrIndex(4), AlgorithmId::SHA1), Some(vec![0u8; 20]));

    // Logging it afterwards would need the TCG bit-0 path, which is not offered.
    let separator = MeasurementRecord::new(PcrIndex(4), EventType::EV_SEPARATOR, digest, Vec::new());
    assert!(matches!(
        svc.log_event(&separator, LOG_ONLY),
        Err(TcgError::InvalidParameter(_))
    ));
    assert_eq!(svc.with_event_log(|log| log.len()), 0);
}

#[test]
fn test_log_event_works_without_device() {
    let svc = TcgService::new(ServiceConfig::default(), SimulatedTpm::absent()).unwrap();
    assert_eq!(svc.log_event(&note(3), LOG_ONLY), Ok(EventNumber(0)));
}

#[test]
fn test_log_event_full() {
    let config = ServiceConfig::default().with_log_region(PhysicalAddress(0x2000), 60);
    let (svc, _sim) = service_with(config);
    svc.log_event(&note(0), LOG_ONLY).unwrap();
    assert_eq!(
        svc.log_event(&note(0), LOG_ONLY),
        Err(TcgError::LogFull {
            required: 49,
            remaining: 11,
            extended: false
        })
    );
}

// --- PassThroughToTpm ---

#[test]
fn test_pass_through_round_trip() {
    let (svc, sim) = service();
    let template = MeasurementRecord::template(PcrIndex(9), EventType::EV_IPL, Vec::new());
    svc.hash_log_extend_event(Some(b"kernel"), AlgorithmId::SHA1, &template)
        .unwrap();

    let response = svc
        .pass_through_to_tpm(&command::pcr_read_command(PcrIndex(9)), 64)
        .unwrap();
    let value = parse_response(&response, 20).unwrap();
    assert_eq!(Some(value.to_vec()), sim.pcr(PcrIndex(9), AlgorithmId::SHA1));
}

#[test]
fn test_pass_through_buffer_too_small() {
    let (svc, sim) = service();
    let cmd = command::pcr_read_command(PcrIndex(0));

    assert_eq!(
        svc.pass_through_to_tpm(&cmd, 8),
        Err(TcgError::BufferTooSmall { required: 30 })
    );
    let response = svc.pass_through_to_tpm(&cmd, 30).unwrap();
    assert_eq!(response.len(), 30);
    // The rejected attempt still ran on the device.
    assert_eq!(sim.commands_seen(), 2);
}

#[test]
fn test_pass_through_is_opaque() {
    let (svc, _sim) = service();
    // Device-level rejections come back as response frames.
    let response = svc.pass_through_to_tpm(&[0xDE, 0xAD], 64).unwrap();
    assert_eq!(
        parse_response(&response, 0),
        Err(DeviceFault::ReturnCode(command::rc::TPM_BAD_PARAM_SIZE))
    );

    assert!(matches!(svc.pass_through_to_tpm(&[], 64), Err(TcgError::InvalidParameter(_))));
}

#[test]
fn test_zero_capacity_reports_required_size() {
    let (svc, _sim) = service();
    let required = svc.status_check(0).unwrap_err();
    assert_eq!(required, TcgError::BufferTooSmall { required: 12 });
    assert!(svc.status_check(12).is_ok());

    assert_eq!(
        svc.hash_all(b"", AlgorithmId::SHA1, 0),
        Err(TcgError::BufferTooSmall { required: 20 })
    );
    assert_eq!(svc.hash_all(b"", AlgorithmId::SHA1, 20).unwrap().len(), 20);

    let cmd = command::pcr_read_command(PcrIndex(3));
    assert_eq!(
        svc.pass_through_to_tpm(&cmd, 0),
        Err(TcgError::BufferTooSmall { required: 30 })
    );
    assert_eq!(svc.pass_through_to_tpm(&cmd, 30).unwrap().len(), 30);
}

#[test]
fn test_pass_through_without_device() {
    let svc = TcgService::new(ServiceConfig::default(), SimulatedTpm::absent()).unwrap();
    let cmd = command::pcr_read_command(PcrIndex(0));
    assert_eq!(svc.pass_through_to_tpm(&cmd, 64), Err(TcgError::DeviceNotPresent));
}

// --- HashLogExtendEvent ---

#[test]
fn test_hash_log_extend_event() {
    let (svc, sim) = service();
    let template = MeasurementRecord::template(PcrIndex(4), EventType::EV_EFI_BOOT_SERVICES_APPLICATION, b"bootx64".to_vec());

    let outcome = svc
        .hash_log_extend_event(Some(b"image bytes"), AlgorithmId::SHA1, &template)
        .unwrap();

    let digest = svc.hash_all(b"image bytes", AlgorithmId::SHA1, 20).unwrap();
    assert_eq!(outcome.record.digest, digest.as_bytes());
    assert_eq!(outcome.record.event_data, b"bootx64");
    assert_eq!(outcome.event_number, EventNumber(0));

    let expected = extend_value(AlgorithmId::SHA1, &[0u8; 20], digest.as_bytes()).unwrap();
    assert_eq!(sim.pcr(PcrIndex(4), AlgorithmId::SHA1), Some(expected));
    assert_eq!(svc.with_event_log(|log| log.get(EventNumber(0))), Some(outcome.record));
}

#[test]
fn test_hash_log_extend_prehashed() {
    let (svc, sim) = service();
    let mut template = MeasurementRecord::template(PcrIndex(1), EventType::EV_PLATFORM_CONFIG_FLAGS, Vec::new());
    template.digest = vec![0x5A; 20];

    let outcome = svc
        .hash_log_extend_event(None, AlgorithmId::SHA1, &template)
        .unwrap();
    assert_eq!(outcome.record.digest, vec![0x5A; 20]);
    let expected = extend_value(AlgorithmId::SHA1, &[0u8; 20], &[0x5A; 20]).unwrap();
    assert_eq!(sim.pcr(PcrIndex(1), AlgorithmId::SHA1), Some(expected));
}

#[test]
fn test_hash_log_extend_validation_has_no_side_effects() {
    let (svc, sim) = service_with(all_algorithms());
    let template = MeasurementRecord::template(PcrIndex(0), EventType::EV_POST_CODE, Vec::new());

    assert_eq!(
        svc.hash_log_extend_event(Some(b"x"), AlgorithmId::SHA256, &template),
        Err(TcgError::BufferTooSmall { required: 32 })
    );
    let widened = template.clone().with_digest_slot(32);
    assert!(svc
        .hash_log_extend_event(Some(b"x"), AlgorithmId::SHA256, &widened)
        .is_ok());

    let out_of_range = MeasurementRecord::template(PcrIndex(24), EventType::EV_POST_CODE, Vec::new());
    assert_eq!(
        svc.hash_log_extend_event(Some(b"x"), AlgorithmId::SHA1, &out_of_range),
        Err(TcgError::InvalidRegisterIndex(PcrIndex(24)))
    );

    let no_action = MeasurementRecord::template(PcrIndex(0), EventType::EV_NO_ACTION, Vec::new());
    assert!(matches!(
        svc.hash_log_extend_event(Some(b"x"), AlgorithmId::SHA1, &no_action),
        Err(TcgError::InvalidParameter(_))
    ));
    assert!(matches!(
        svc.hash_log_extend_event(Some(b"x"), AlgorithmId(0), &template),
        Err(TcgError::InvalidParameter(_))
    ));

    assert_eq!(sim.commands_seen(), 1);
    assert_eq!(svc.with_event_log(|log| log.len()), 1);
}

#[test]
fn test_hash_log_extend_unadvertised_algorithm() {
    let (svc, sim) = service();
    let template = MeasurementRecord::template(PcrIndex(0), EventType::EV_POST_CODE, Vec::new()).with_digest_slot(48);
    assert_eq!(
        svc.hash_log_extend_event(Some(b"x"), AlgorithmId::SHA384, &template),
        Err(TcgError::UnsupportedAlgorithm(AlgorithmId::SHA384))
    );
    assert_eq!(sim.commands_seen(), 0);
}

#[test]
fn test_hash_log_extend_without_device() {
    let svc = TcgService::new(ServiceConfig::default(), SimulatedTpm::absent()).unwrap();
    let template = MeasurementRecord::template(PcrIndex(0), EventType::EV_POST_CODE, Vec::new());
    assert_eq!(
        svc.hash_log_extend_event(Some(b"x"), AlgorithmId::SHA1, &template),
        Err(TcgError::DeviceNotPresent)
    );
    assert_eq!(svc.with_event_log(|log| log.len()), 0);
}

#[test]
fn test_hash_log_extend_deactivated() {
    let (svc, sim) = service();
    sim.set_deactivated(true);
    let template = MeasurementRecord::template(PcrIndex(0), EventType::EV_POST_CODE, Vec::new());
    assert_eq!(
        svc.hash_log_extend_event(Some(b"x"), AlgorithmId::SHA1, &template),
        Err(TcgError::DeviceError(DeviceFault::Deactivated))
    );
    assert_eq!(sim.commands_seen(), 0);
    assert_eq!(svc.with_event_log(|log| log.len()), 0);
}

#[test]
fn test_failed_extend_leaves_log_untouched() {
    let (svc, sim) = service();
    let template = MeasurementRecord::template(PcrIndex(6), EventType::EV_POST_CODE, Vec::new());

    sim.fail_next(TransportError::Timeout);
    assert_eq!(
        svc.hash_log_extend_event(Some(b"x"), AlgorithmId::SHA1, &template),
        Err(TcgError::DeviceError(DeviceFault::Transport(TransportError::Timeout)))
    );
    assert_eq!(svc.with_event_log(|log| log.len()), 0);
    assert_eq!(sim.pcr(PcrIndex(6), AlgorithmId::SHA1), Some(vec![0u8; 20]));

    // The fault was one-shot.
    assert!(svc
        .hash_log_extend_event(Some(b"x"), AlgorithmId::SHA1, &template)
        .is_ok());
}

#[test]
fn test_log_full_after_extend() {
    // Room for exactly one 36-byte entry plus a few spare bytes.
    let config = ServiceConfig::default().with_log_region(PhysicalAddress(0x3000), 40);
    let (svc, sim) = service_with(config);
    let template = MeasurementRecord::template(PcrIndex(2), EventType::EV_POST_CODE, Vec::new());

    svc.hash_log_extend_event(Some(b"one"), AlgorithmId::SHA1, &template)
        .unwrap();
    let before = sim.pcr(PcrIndex(2), AlgorithmId::SHA1);

    assert_eq!(
        svc.hash_log_extend_event(Some(b"two"), AlgorithmId::SHA1, &template),
        Err(TcgError::LogFull {
            required: 36,
            remaining: 4,
            extended: true
        })
    );
    assert_ne!(sim.pcr(PcrIndex(2), AlgorithmId::SHA1), before);
    assert_eq!(svc.with_event_log(|log| log.len()), 1);
}

#[test]
fn test_outcome_status_words() {
    use crate::error::Status;
    let (svc, _sim) = service();
    assert_eq!(Status::from(&svc.status_check(12)), Status::SUCCESS);
    assert_eq!(Status::from(&svc.status_check(4)), Status::BUFFER_TOO_SMALL);
    assert_eq!(
        Status::from(&svc.hash_all(b"", AlgorithmId::SHA256, 32)),
        Status::UNSUPPORTED
    );
}
