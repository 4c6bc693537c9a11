//! Utility to verify a pipeline artifact before deploying it.

use std::sync::Arc;

use immo_predict::pipeline::{self, Pipeline};
use immo_predict::predictor::Predictor;
use immo_predict::models::{
    Epc, EquippedKitchen, HeatingType, PropertyFeatures, Province, SubpropertyType,
};
use immo_predict::wizard::format_price;

/// Apartment in Antwerp used to sanity-check a freshly exported artifact.
fn reference_listing() -> PropertyFeatures {
    PropertyFeatures {
        total_area_sqm: 100.0,
        cadastral_income: 500.0,
        primary_energy_consumption_sqm: 150.0,
        nbr_bedrooms: 3,
        nbr_frontages: 2,
        subproperty_type: SubpropertyType::Apartment,
        province: Province::Antwerp,
        fl_terrace: true,
        fl_garden: false,
        fl_swimming_pool: false,
        fl_furnished: false,
        epc: Epc::Good,
        equipped_kitchen: EquippedKitchen::Installed,
        heating_type: HeatingType::Gas,
    }
}

/// Main entry point for the artifact check.
///
/// Loads the artifact named on the command line (or `MODEL_PATH`) exactly as the
/// server does, prints what it found and scores the reference listing.
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MODEL_PATH").ok())
        .unwrap_or_else(|| "models/model.onnx".to_string());

    let artifact = pipeline::load_artifact(&path)?;
    let summary = artifact.pipeline.summary();

    println!("Artifact:        {}", path);
    println!("Version:         {}", summary.version);
    println!("SHA-256:         {}", artifact.sha256);
    println!("Producer:        {}", summary.producer);
    println!("Regressor:       {}", summary.regressor);
    println!("Input columns:");
    for column in artifact.pipeline.feature_names_in() {
        println!("  - {}", column);
    }

    let predictor = Predictor::new(Arc::new(artifact.pipeline), 1);
    let listing = reference_listing();
    let price = predictor.predict_blocking(&listing)?;

    println!();
    println!(
        "Reference listing: {} m² {} in {}, EPC {}",
        listing.total_area_sqm, listing.subproperty_type, listing.province, listing.epc
    );
    println!("Predicted price: {}", format_price(price));

    Ok(())
}
