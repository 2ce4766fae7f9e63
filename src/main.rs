//! vnproto demo - event lifecycle dan latency call vs async
//!
//! Menjalankan skenario create/get/set/reset/destroy lewat loopback
//! channel, lalu mengukur latency blocking call dan async submit.
//!
//! Usage:
//!   cargo run --release -- --ops 100000 --ring 4 --verbose

use std::time::Instant;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vnproto::protocol::{
    Device, Event, EventCreateInfo, ResultCode, Semaphore, SemaphoreCreateInfo,
    SemaphoreSignalInfo,
};
use vnproto::{Instance, LoopbackChannel, LoopbackConfig, ObjectIds};

/// Demo configuration
#[derive(Debug, Clone)]
struct DemoConfig {
    /// Jumlah operasi per benchmark
    ops: usize,
    /// Ukuran command ring dalam MB
    ring_mb: usize,
    verbose: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            ops: 100_000,
            ring_mb: 1,
            verbose: false,
        }
    }
}

fn parse_args() -> DemoConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = DemoConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--ops" | "-n" => {
                if i + 1 < args.len() {
                    config.ops = args[i + 1].parse().unwrap_or(100_000);
                    i += 1;
                }
            }
            "--ring" | "-r" => {
                if i + 1 < args.len() {
                    config.ring_mb = args[i + 1].parse().unwrap_or(1);
                    i += 1;
                }
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--help" | "-h" => {
                println!("vnproto demo - remote command marshalling\n");
                println!("Usage: vnproto [OPTIONS]\n");
                println!("Options:");
                println!("  -n, --ops <N>      Operations per benchmark (default: 100000)");
                println!("  -r, --ring <MB>    Command ring size in MB, power of 2 (default: 1)");
                println!("  -v, --verbose      Debug logging");
                println!("  -h, --help         Show this help");
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

fn init_logging(verbose: bool) {
    let default = if verbose { "vnproto=debug" } else { "vnproto=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() {
    let config = parse_args();
    init_logging(config.verbose);

    println!("vnproto - Remote Command Marshalling Demo");
    println!("=========================================\n");

    let loopback = LoopbackConfig {
        ring_capacity: config.ring_mb.max(1) << 20,
        ..LoopbackConfig::default()
    };
    let channel = match LoopbackChannel::new(loopback) {
        Ok(channel) => channel,
        Err(e) => {
            eprintln!("Failed to start loopback channel: {}", e);
            std::process::exit(1);
        }
    };
    let instance = Instance::new(channel);
    let ids = ObjectIds::new();
    let device: Device = ids.allocate();

    event_lifecycle(&instance, &ids, device);
    timeline_semaphore(&instance, &ids, device);
    benchmark_call_vs_async(&instance, &ids, device, config.ops);

    println!("\nAll scenarios complete!");
}

fn expect_result(op: &str, got: ResultCode, want: ResultCode) {
    let mark = if got == want { "ok" } else { "MISMATCH" };
    println!("  {:<24} {:?} [{}]", op, got, mark);
}

fn event_lifecycle(instance: &Instance<LoopbackChannel>, ids: &ObjectIds, device: Device) {
    println!("Event Lifecycle");
    println!("---------------");

    let info = EventCreateInfo::default();
    let mut event: Event = ids.allocate();
    let created = instance.call_create_event(device, Some(&info), None, &mut event);
    expect_result("CreateEvent", created, ResultCode::Success);

    expect_result(
        "GetEventStatus",
        instance.call_get_event_status(device, event),
        ResultCode::EventReset,
    );
    expect_result("SetEvent", instance.call_set_event(device, event), ResultCode::Success);
    expect_result(
        "GetEventStatus",
        instance.call_get_event_status(device, event),
        ResultCode::EventSet,
    );
    expect_result("ResetEvent", instance.call_reset_event(device, event), ResultCode::Success);
    expect_result(
        "GetEventStatus",
        instance.call_get_event_status(device, event),
        ResultCode::EventReset,
    );
    instance.async_destroy_event(device, event, None);
    println!("  {:<24} submitted\n", "DestroyEvent (async)");
}

fn timeline_semaphore(instance: &Instance<LoopbackChannel>, ids: &ObjectIds, device: Device) {
    println!("Timeline Semaphore");
    println!("------------------");

    let info = SemaphoreCreateInfo::timeline(1);
    let mut semaphore: Semaphore = ids.allocate();
    let created = instance.call_create_semaphore(device, Some(&info), None, &mut semaphore);
    expect_result("CreateSemaphore", created, ResultCode::Success);

    let signal = SemaphoreSignalInfo {
        semaphore,
        value: 5,
        chain: Vec::new(),
    };
    expect_result(
        "SignalSemaphore",
        instance.call_signal_semaphore(device, Some(&signal)),
        ResultCode::Success,
    );

    let mut value = 0u64;
    let result = instance.call_get_semaphore_counter_value(device, semaphore, &mut value);
    expect_result("GetSemaphoreCounterValue", result, ResultCode::Success);
    println!("  counter value: {}", value);

    instance.call_destroy_semaphore(device, semaphore, None);
    println!("  {:<24} done\n", "DestroySemaphore");
}

fn benchmark_call_vs_async(
    instance: &Instance<LoopbackChannel>,
    ids: &ObjectIds,
    device: Device,
    ops: usize,
) {
    println!("Call vs Async Latency");
    println!("---------------------");

    let info = EventCreateInfo::default();
    let mut event: Event = ids.allocate();
    instance.call_create_event(device, Some(&info), None, &mut event);

    // Warm up
    for _ in 0..1000 {
        instance.call_set_event(device, event);
    }

    // Blocking round trip
    let start = Instant::now();
    for _ in 0..ops {
        instance.call_set_event(device, event);
    }
    let call_duration = start.elapsed();

    // Fire-and-forget, diakhiri satu call untuk drain
    let start = Instant::now();
    for _ in 0..ops {
        instance.async_set_event(device, event);
    }
    instance.call_get_event_status(device, event);
    let async_duration = start.elapsed();

    instance.async_destroy_event(device, event, None);

    let call_ns = call_duration.as_nanos() as f64 / ops.max(1) as f64;
    let async_ns = async_duration.as_nanos() as f64 / ops.max(1) as f64;

    println!("  Operations: {}", ops);
    println!(
        "  call_set_event:  {:.2} ns/op ({:.3} μs/op)",
        call_ns,
        call_ns / 1000.0
    );
    println!(
        "  async_set_event: {:.2} ns/op ({:.3} μs/op)",
        async_ns,
        async_ns / 1000.0
    );
    println!(
        "  Async throughput: {:.2} M ops/sec",
        ops as f64 / async_duration.as_secs_f64() / 1_000_000.0
    );
    println!(
        "  Commands executed by renderer: {}",
        instance.channel().executed()
    );
}
