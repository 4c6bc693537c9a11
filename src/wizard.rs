//! Step-by-step collection of listing attributes for the form client.
//!
//! The wizard is a bounded linear sequence of steps. `next`/`previous` move within
//! `Landing..=Review`; `submit` from `Review` is the only way into the terminal
//! `Submitted` step and yields exactly one well-formed [`PropertyFeatures`].

use std::fmt;

use crate::models::*;

/// Steps of the form, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Step {
    #[default]
    Landing,
    PropertyBasics,
    EnergyInstallations,
    Amenities,
    Review,
    Submitted,
}

impl Step {
    const NAVIGABLE: [Step; 5] = [
        Step::Landing,
        Step::PropertyBasics,
        Step::EnergyInstallations,
        Step::Amenities,
        Step::Review,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn title(&self) -> &'static str {
        match self {
            Step::Landing => "Immo Eliza Price Prediction",
            Step::PropertyBasics => "Step 1 of 4: Property Basics",
            Step::EnergyInstallations => "Step 2 of 4: Energy & Installations",
            Step::Amenities => "Step 3 of 4: Amenities",
            Step::Review => "Step 4 of 4: Review Data",
            Step::Submitted => "Prediction Result",
        }
    }
}

/// Input bounds of the form widgets. Tighter than what the API accepts.
pub mod bounds {
    pub const TOTAL_AREA_SQM: (f64, f64) = (10.0, 2000.0);
    pub const NBR_BEDROOMS: (u32, u32) = (0, 20);
    pub const NBR_FRONTAGES: (u8, u8) = (1, 4);
    pub const CADASTRAL_INCOME: (f64, f64) = (0.0, 10000.0);
    pub const PRIMARY_ENERGY_CONSUMPTION_SQM: (f64, f64) = (0.0, 2000.0);
}

/// Human label shown for each property sub-type.
pub fn subproperty_label(kind: SubpropertyType) -> &'static str {
    match kind {
        SubpropertyType::Apartment => "Apartment",
        SubpropertyType::House => "House",
        SubpropertyType::Duplex => "Duplex",
        SubpropertyType::Villa => "Villa",
        SubpropertyType::ExceptionalProperty => "Exceptional property",
        SubpropertyType::FlatStudio => "Flat studio",
        SubpropertyType::GroundFloor => "Ground floor",
        SubpropertyType::Penthouse => "Penthouse",
        SubpropertyType::Farmhouse => "Farmhouse",
        SubpropertyType::ApartmentBlock => "Apartment block",
        SubpropertyType::CountryCottage => "Country cottage",
        SubpropertyType::TownHouse => "Town house",
        SubpropertyType::ServiceFlat => "Service flat",
        SubpropertyType::Mansion => "Mansion",
        SubpropertyType::MixedUseBuilding => "Mixed use building",
        SubpropertyType::ManorHouse => "Manor house",
        SubpropertyType::Loft => "Loft",
        SubpropertyType::Bungalow => "Bungalow",
        SubpropertyType::Kot => "Kot",
        SubpropertyType::Castle => "Castle",
        SubpropertyType::Chalet => "Chalet",
        SubpropertyType::Triplex => "Triplex",
        SubpropertyType::OtherProperty => "Other property",
    }
}

/// A form value outside its widget bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct OutOfBounds {
    pub field: &'static str,
    pub min: f64,
    pub max: f64,
}

impl fmt::Display for OutOfBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} must be between {} and {}", self.field, self.min, self.max)
    }
}

impl std::error::Error for OutOfBounds {}

fn check(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), OutOfBounds> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(OutOfBounds { field, min, max })
    }
}

/// Form state. Starts from the defaults the form pre-fills.
#[derive(Debug, Clone, PartialEq)]
pub struct FormDraft {
    features: PropertyFeatures,
}

impl Default for FormDraft {
    fn default() -> Self {
        Self {
            features: PropertyFeatures {
                total_area_sqm: 100.0,
                cadastral_income: 0.0,
                primary_energy_consumption_sqm: 100.0,
                nbr_bedrooms: 2,
                nbr_frontages: 2,
                subproperty_type: SubpropertyType::Apartment,
                province: Province::Antwerp,
                fl_terrace: false,
                fl_garden: false,
                fl_swimming_pool: false,
                fl_furnished: false,
                epc: Epc::Good,
                equipped_kitchen: EquippedKitchen::Unknown,
                heating_type: HeatingType::Gas,
            },
        }
    }
}

impl FormDraft {
    pub fn features(&self) -> &PropertyFeatures {
        &self.features
    }

    pub fn set_total_area_sqm(&mut self, value: f64) -> Result<(), OutOfBounds> {
        check("total_area_sqm", value, bounds::TOTAL_AREA_SQM)?;
        self.features.total_area_sqm = value;
        Ok(())
    }

    pub fn set_cadastral_income(&mut self, value: f64) -> Result<(), OutOfBounds> {
        check("cadastral_income", value, bounds::CADASTRAL_INCOME)?;
        self.features.cadastral_income = value;
        Ok(())
    }

    pub fn set_primary_energy_consumption_sqm(&mut self, value: f64) -> Result<(), OutOfBounds> {
        check(
            "primary_energy_consumption_sqm",
            value,
            bounds::PRIMARY_ENERGY_CONSUMPTION_SQM,
        )?;
        self.features.primary_energy_consumption_sqm = value;
        Ok(())
    }

    pub fn set_nbr_bedrooms(&mut self, value: u32) -> Result<(), OutOfBounds> {
        let (min, max) = bounds::NBR_BEDROOMS;
        check("nbr_bedrooms", f64::from(value), (f64::from(min), f64::from(max)))?;
        self.features.nbr_bedrooms = value;
        Ok(())
    }

    pub fn set_nbr_frontages(&mut self, value: u8) -> Result<(), OutOfBounds> {
        let (min, max) = bounds::NBR_FRONTAGES;
        check("nbr_frontages", f64::from(value), (f64::from(min), f64::from(max)))?;
        self.features.nbr_frontages = value;
        Ok(())
    }

    pub fn set_subproperty_type(&mut self, value: SubpropertyType) {
        self.features.subproperty_type = value;
    }

    pub fn set_province(&mut self, value: Province) {
        self.features.province = value;
    }

    pub fn set_epc(&mut self, value: Epc) {
        self.features.epc = value;
    }

    pub fn set_equipped_kitchen(&mut self, value: EquippedKitchen) {
        self.features.equipped_kitchen = value;
    }

    pub fn set_heating_type(&mut self, value: HeatingType) {
        self.features.heating_type = value;
    }

    pub fn set_terrace(&mut self, value: bool) {
        self.features.fl_terrace = value;
    }

    pub fn set_garden(&mut self, value: bool) {
        self.features.fl_garden = value;
    }

    pub fn set_swimming_pool(&mut self, value: bool) {
        self.features.fl_swimming_pool = value;
    }

    pub fn set_furnished(&mut self, value: bool) {
        self.features.fl_furnished = value;
    }

    /// Label/value pairs of the review table.
    pub fn review_rows(&self) -> Vec<(&'static str, String)> {
        let f = &self.features;
        let yes_no = |b: bool| (if b { "Yes" } else { "No" }).to_string();
        vec![
            ("Total area (m²)", f.total_area_sqm.to_string()),
            ("Cadastral income", f.cadastral_income.to_string()),
            (
                "Primary energy consumption (kWh/m²)",
                f.primary_energy_consumption_sqm.to_string(),
            ),
            ("Bedrooms", f.nbr_bedrooms.to_string()),
            ("Frontages", f.nbr_frontages.to_string()),
            ("Property type", subproperty_label(f.subproperty_type).to_string()),
            ("Province", f.province.to_string()),
            ("Terrace", yes_no(f.fl_terrace)),
            ("Garden", yes_no(f.fl_garden)),
            ("Swimming pool", yes_no(f.fl_swimming_pool)),
            ("Furnished", yes_no(f.fl_furnished)),
            ("EPC", f.epc.to_string()),
            ("Equipped kitchen", f.equipped_kitchen.to_string()),
            ("Heating type", f.heating_type.to_string()),
        ]
    }
}

/// Linear form flow over a [`FormDraft`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormWizard {
    step: Step,
    draft: FormDraft,
}

impl FormWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn draft(&self) -> &FormDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut FormDraft {
        &mut self.draft
    }

    /// Advances one step; stays on `Review` (use [`submit`](Self::submit)) and on `Submitted`.
    pub fn next(&mut self) -> Step {
        if self.step < Step::Review {
            self.step = Step::NAVIGABLE[self.step.index() + 1];
        }
        self.step
    }

    /// Goes back one step; stays on `Landing` and on `Submitted`.
    pub fn previous(&mut self) -> Step {
        if self.step > Step::Landing && self.step <= Step::Review {
            self.step = Step::NAVIGABLE[self.step.index() - 1];
        }
        self.step
    }

    /// Finishes the form from `Review`, producing the request to send.
    ///
    /// Returns `None` from any other step.
    pub fn submit(&mut self) -> Option<PropertyFeatures> {
        if self.step != Step::Review {
            return None;
        }
        self.step = Step::Submitted;
        Some(self.draft.features.clone())
    }

    /// Starts a new prediction, keeping the previous answers as defaults.
    pub fn restart(&mut self) {
        self.step = Step::PropertyBasics;
    }
}

/// Formats a price the way the result page shows it, e.g. `€ 312,450`.
pub fn format_price(price: f64) -> String {
    let rounded = price.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0 {
        format!("€ -{}", grouped)
    } else {
        format!("€ {}", grouped)
    }
}
