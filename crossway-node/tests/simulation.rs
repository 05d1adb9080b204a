use crossway_node::{SampleMode, SimulationConfig, SimulationDriver, TransportKind};

#[tokio::test]
async fn test_simulation_over_grpc() {
    let config = SimulationConfig {
        total_vehicles: 8,
        byzantine_ratio: 0.0,
        line_count: 1,
        vision_time_ms: 300,
        rpc_timeout_ms: 500,
        base_port: 47200,
        sample_mode: SampleMode::Fixed,
        transport: TransportKind::Grpc,
        seed: Some(5),
        ..SimulationConfig::default()
    };
    config.validate().unwrap();

    let report = SimulationDriver::from_config(config).run().await;

    assert_eq!(report.vehicles, 8);
    assert_eq!(report.byzantine, 0);
    assert_eq!(report.rounds, 2);
    assert_eq!(report.passed, 8);
}

#[tokio::test(start_paused = true)]
async fn test_byzantine_heavy_pool_still_drains() {
    let config = SimulationConfig {
        total_vehicles: 30,
        byzantine_ratio: 0.5,
        transport: TransportKind::InMemory,
        seed: Some(99),
        ..SimulationConfig::default()
    };

    let report = SimulationDriver::from_config(config).run().await;

    assert_eq!(report.byzantine, 15);
    assert_eq!(report.passed, 30);
    let pct = report.fallback_percentage().unwrap();
    assert!(pct <= 100);
}
