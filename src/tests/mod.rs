pub mod service_tests;
pub mod concurrency_tests;

use crate::config::ServiceConfig;
use crate::sim::SimulatedTpm;
use crate::types::algorithm::AlgorithmBitmap;
use crate::TcgService;

/// A service over a fresh simulated device, plus a handle to inspect it.
pub(crate) fn service_with(config: ServiceConfig) -> (TcgService<SimulatedTpm>, SimulatedTpm) {
    let sim = SimulatedTpm::new();
    let service = TcgService::new(config, sim.clone()).unwrap();
    (service, sim)
}

pub(crate) fn service() -> (TcgService<SimulatedTpm>, SimulatedTpm) {
    service_with(ServiceConfig::default())
}

pub(crate) fn all_algorithms() -> ServiceConfig {
    ServiceConfig::default().with_algorithms(AlgorithmBitmap::all())
}
