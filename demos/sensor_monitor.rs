//! Real-time SmartHome sensor monitoring example
//!
//! Run with: cargo run --example sensor_monitor
//!
//! Set `OPENWEATHER_API_KEY` and `WEATHER_CITY` to show outdoor conditions too.

use smarthome_ble::{
    Error, OpenWeatherClient, Result, SessionEvent, SmartHomeManager, WeatherConfig,
    WeatherProvider,
};
use std::io::Write;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (minimal)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    println!("SmartHome Sensor Monitor");
    println!("========================\n");

    let manager = SmartHomeManager::new().await?;
    let mut events = manager.subscribe();

    println!("Waiting for Bluetooth...");
    while !manager.is_radio_on() {
        match events.recv().await {
            Ok(SessionEvent::RadioStateChanged { powered_on: true }) => break,
            Ok(_) => {}
            Err(_) => return Err(Error::BluetoothUnavailable),
        }
    }

    println!("Looking for sensors...\n");
    manager.start_scanning()?;

    // Wait for a sensor to be discovered
    tokio::time::sleep(Duration::from_secs(5)).await;

    let peripheral = manager
        .scan_results()
        .into_iter()
        .next()
        .ok_or_else(|| Error::ConnectionFailed {
            reason: "no SmartHome sensor found".to_string(),
        })?;

    println!("Found sensor: {}", peripheral);
    println!("Connecting...\n");
    manager.connect(peripheral.id)?;

    let weather = outdoor_weather().await;

    let mut alert = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\n\nExiting...");
                break;
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Co2Alert { show }) => alert = show,
                Ok(event) => {
                    if let Some(label) = event.error_label() {
                        eprintln!("{}", label);
                    }
                }
                Err(_) => {}
            },
            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                display(&manager, alert, weather.as_deref());
            }
        }
    }

    println!("{}", manager.export_json()?);

    manager.disconnect();
    manager.shutdown();

    Ok(())
}

async fn outdoor_weather() -> Option<String> {
    let city = std::env::var("WEATHER_CITY").ok()?;
    let config = WeatherConfig::from_env().ok()?;

    match OpenWeatherClient::new(config).current_weather(&city).await {
        Ok(report) => Some(format!(
            "{}: {:.1}°C, {:.0}% humidity",
            report.city, report.temperature, report.humidity
        )),
        Err(e) => {
            eprintln!("Weather unavailable: {}", e);
            None
        }
    }
}

fn display(manager: &SmartHomeManager, alert: bool, weather: Option<&str>) {
    // Clear screen and move cursor to top
    print!("\x1B[2J\x1B[1;1H");

    println!("=== Sensor Monitor ===");
    match manager.connected_peripheral() {
        Some(peripheral) => println!("Sensor: {}", peripheral),
        None => println!("Sensor: --"),
    }
    println!("Status: {}\n", manager.status());

    if let Some(weather) = weather {
        println!("Outdoor: {}\n", weather);
    }

    println!("Readings:");
    println!("---------");
    for series in manager.sensor_series() {
        if !series.is_named() {
            continue;
        }
        match (series.latest(), series.last_timestamp()) {
            (Some(value), Some(at)) => println!(
                "  {:<12} {:8.2}  ({} samples, last {})",
                series.name(),
                value,
                series.len(),
                at.format("%H:%M:%S")
            ),
            _ => println!("  {:<12}       --", series.name()),
        }
    }

    if let Some(quality) = manager.air_quality() {
        println!("\nAir quality: {}", quality);
    }
    if alert {
        println!("\n⚠️  CO2 level is high, open a window!");
    }

    println!("\nPress Ctrl+C to exit");
    let _ = std::io::stdout().flush();
}
