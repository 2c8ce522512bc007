#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use energy_ml::{RawRecord, TrainingOptions, Value};

/// Синтетические почасовые показания здания
pub fn write_energy_csv(dir: &Path, rows: usize) -> PathBuf {
    let path = dir.join("energy_data.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        "Timestamp,Temperature,Humidity,Square Footage,Occupancy,HVAC-Usage,LightingUsage,RenewableEnergy,Holiday,EnergyConsumption"
    )
    .unwrap();

    for i in 0..rows {
        let day = 1 + (i / 24) % 28;
        let hour = i % 24;
        let temperature = 18.0 + ((i * 7) % 15) as f64;
        let humidity = 40.0 + ((i * 3) % 20) as f64;
        let occupancy = (i % 10) as f64;
        let hvac = if i % 3 == 0 { "On" } else { "Off" };
        let lighting = if hour >= 18 { "On" } else { "Off" };
        let renewable = ((i * 11) % 30) as f64 / 2.0;
        let holiday = if day % 7 == 0 { "Yes" } else { "No" };
        let energy = 50.0 + 1.2 * temperature + 2.5 * occupancy - 0.3 * renewable
            + if hvac == "On" { 8.0 } else { 0.0 };
        // пропуски в части ячеек
        let humidity = if i % 17 == 5 { String::new() } else { humidity.to_string() };

        writeln!(
            file,
            "2024-02-{:02} {:02}:00:00,{},{},1500,{},{},{},{},{},{:.3}",
            day, hour, temperature, humidity, occupancy, hvac, lighting, renewable, holiday, energy
        )
        .unwrap();
    }
    file.flush().unwrap();
    path
}

pub fn options(dir: &Path, rows: usize) -> TrainingOptions {
    TrainingOptions {
        data_path: write_energy_csv(dir, rows),
        artifact_dir: dir.join("artifacts"),
        candidate_budget: None,
        ..TrainingOptions::default()
    }
}

pub fn reading() -> RawRecord {
    let mut r = RawRecord::new();
    r.insert("Timestamp".into(), Value::from("2024-02-10 14:00:00"));
    r.insert("Temperature".into(), Value::Number(24.0));
    r.insert("Humidity".into(), Value::Number(45.0));
    r.insert("Square Footage".into(), Value::Number(1500.0));
    r.insert("Occupancy".into(), Value::Number(6.0));
    r.insert("HVAC-Usage".into(), Value::from("On"));
    r.insert("LightingUsage".into(), Value::from("Off"));
    r.insert("RenewableEnergy".into(), Value::Number(4.5));
    r.insert("Holiday".into(), Value::from("No"));
    r
}
