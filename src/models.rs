use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Declares a closed, string-valued category with its exact wire spellings.
///
/// Every generated enum exposes `ALL` (declaration order), `as_str`, `allowed_values`
/// and a case-sensitive `FromStr` that only accepts the wire spellings.
macro_rules! closed_category {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The exact string sent over the wire and fed to the pipeline.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }

            pub fn allowed_values() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_category! {
    /// Listing sub-type as published by the Belgian listing portals.
    SubpropertyType {
        Apartment => "APARTMENT",
        House => "HOUSE",
        Duplex => "DUPLEX",
        Villa => "VILLA",
        ExceptionalProperty => "EXCEPTIONAL_PROPERTY",
        FlatStudio => "FLAT_STUDIO",
        GroundFloor => "GROUND_FLOOR",
        Penthouse => "PENTHOUSE",
        Farmhouse => "FARMHOUSE",
        ApartmentBlock => "APARTMENT_BLOCK",
        CountryCottage => "COUNTRY_COTTAGE",
        TownHouse => "TOWN_HOUSE",
        ServiceFlat => "SERVICE_FLAT",
        Mansion => "MANSION",
        MixedUseBuilding => "MIXED_USE_BUILDING",
        ManorHouse => "MANOR_HOUSE",
        Loft => "LOFT",
        Bungalow => "BUNGALOW",
        Kot => "KOT",
        Castle => "CASTLE",
        Chalet => "CHALET",
        Triplex => "TRIPLEX",
        OtherProperty => "OTHER_PROPERTY",
    }
}

closed_category! {
    /// Belgian province (Brussels counted as its own region).
    Province {
        Antwerp => "Antwerp",
        EastFlanders => "East Flanders",
        Brussels => "Brussels",
        WalloonBrabant => "Walloon Brabant",
        FlemishBrabant => "Flemish Brabant",
        Liege => "Liège",
        WestFlanders => "West Flanders",
        Hainaut => "Hainaut",
        Luxembourg => "Luxembourg",
        Limburg => "Limburg",
        Namur => "Namur",
    }
}

closed_category! {
    /// Energy Performance Certificate bucket, harmonised across the three regions.
    Epc {
        Excellent => "excellent",
        Good => "good",
        Poor => "poor",
        Bad => "bad",
        Unknown => "unknown",
    }
}

closed_category! {
    EquippedKitchen {
        Unknown => "UNKNOWN",
        Installed => "INSTALLED",
        SemiEquipped => "SEMI-EQUIPPED",
        HyperEquipped => "HYPER-EQUIPPED",
    }
}

closed_category! {
    HeatingType {
        Gas => "GAS",
        Electric => "ELECTRIC",
        HeatPump => "HEAT_PUMP",
        Oil => "OIL",
        Other => "OTHER",
    }
}

/// The fourteen raw attributes of a listing, as accepted by `POST /predict`.
///
/// Instances are only produced by [`crate::validation::validate_payload`] on the
/// server side (or by the form wizard on the client side), so every value already
/// satisfies its range and category constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PropertyFeatures {
    /// Total living area in square metres (> 0).
    pub total_area_sqm: f64,
    /// Cadastral income in euros (>= 0).
    pub cadastral_income: f64,
    /// Primary energy consumption in kWh per square metre (>= 0).
    pub primary_energy_consumption_sqm: f64,
    pub nbr_bedrooms: u32,
    /// Number of facades, 1 to 4.
    pub nbr_frontages: u8,
    pub subproperty_type: SubpropertyType,
    pub province: Province,
    pub fl_terrace: bool,
    pub fl_garden: bool,
    pub fl_swimming_pool: bool,
    pub fl_furnished: bool,
    pub epc: Epc,
    pub equipped_kitchen: EquippedKitchen,
    pub heating_type: HeatingType,
}

/// Successful `POST /predict` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PredictionResponse {
    /// Estimated price in euros.
    pub predicted_price: f64,
}

/// Description of the loaded pipeline, served on `GET /model-info`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModelInfo {
    pub version: String,
    /// Tool that exported the artifact.
    pub producer: String,
    pub regressor: String,
    /// Hex SHA-256 of the artifact bytes, when loaded from a file.
    pub sha256: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    pub loaded_at: chrono::DateTime<chrono::Utc>,
    pub input_columns: Vec<String>,
    pub inference_concurrency: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_sizes() {
        assert_eq!(SubpropertyType::ALL.len(), 23);
        assert_eq!(Province::ALL.len(), 11);
        assert_eq!(Epc::ALL.len(), 5);
        assert_eq!(EquippedKitchen::ALL.len(), 4);
        assert_eq!(HeatingType::ALL.len(), 5);
    }

    #[test]
    fn test_wire_spelling_is_exact() {
        assert_eq!("Liège".parse::<Province>(), Ok(Province::Liege));
        assert!("Liege".parse::<Province>().is_err());
        assert!("antwerp".parse::<Province>().is_err());
        assert_eq!(
            "SEMI-EQUIPPED".parse::<EquippedKitchen>(),
            Ok(EquippedKitchen::SemiEquipped)
        );
        assert!("HEAT PUMP".parse::<HeatingType>().is_err());
    }

    #[test]
    fn test_serde_matches_as_str() {
        for kind in HeatingType::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::json!(kind.as_str()));
        }
        let parsed: Province = serde_json::from_str("\"West Flanders\"").unwrap();
        assert_eq!(parsed, Province::WestFlanders);
    }

    #[test]
    fn test_prediction_response_shape() {
        let body = serde_json::to_value(PredictionResponse {
            predicted_price: 250_000.5,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "predicted_price": 250000.5 }));
    }
}
