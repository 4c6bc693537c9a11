//! Request validation for `POST /predict`.
//!
//! The payload is inspected field by field rather than deserialized in one go, so
//! a rejected request reports every offending field at once.

use serde_json::{Map, Value};
use std::str::FromStr;

use crate::errors::{FieldError, FieldIssue, ValidationError};
use crate::features::FEATURE_COLUMNS;
use crate::models::*;

/// Collects field errors while reading a JSON object.
struct FieldReader<'a> {
    body: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> FieldReader<'a> {
    fn new(body: &'a Map<String, Value>) -> Self {
        Self {
            body,
            errors: Vec::new(),
        }
    }

    fn reject(&mut self, field: &str, issue: FieldIssue) {
        self.errors.push(FieldError {
            field: field.to_string(),
            issue,
        });
    }

    fn present(&mut self, field: &str) -> Option<&'a Value> {
        match self.body.get(field) {
            Some(value) => Some(value),
            None => {
                self.reject(field, FieldIssue::Missing);
                None
            }
        }
    }

    /// Finite number satisfying `accept`.
    fn number(
        &mut self,
        field: &str,
        accept: fn(f64) -> bool,
        constraint: &'static str,
    ) -> Option<f64> {
        let value = self.present(field)?;
        match value.as_f64().filter(|v| v.is_finite()) {
            Some(v) if accept(v) => Some(v),
            Some(_) => {
                self.reject(field, FieldIssue::OutOfRange { expected: constraint });
                None
            }
            None => {
                self.reject(field, FieldIssue::WrongType { expected: "number" });
                None
            }
        }
    }

    /// Whole number within `min..=max`; `3.0` counts as an integer.
    fn integer(&mut self, field: &str, min: i64, max: i64, constraint: &'static str) -> Option<i64> {
        let value = self.present(field)?;
        let whole = value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|v| v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15)
                .map(|v| v as i64)
        });
        match whole {
            Some(v) if (min..=max).contains(&v) => Some(v),
            Some(_) => {
                self.reject(field, FieldIssue::OutOfRange { expected: constraint });
                None
            }
            None if value.is_u64() => {
                self.reject(field, FieldIssue::OutOfRange { expected: constraint });
                None
            }
            None => {
                self.reject(field, FieldIssue::WrongType { expected: "integer" });
                None
            }
        }
    }

    fn boolean(&mut self, field: &str) -> Option<bool> {
        let value = self.present(field)?;
        match value.as_bool() {
            Some(b) => Some(b),
            None => {
                self.reject(field, FieldIssue::WrongType { expected: "boolean" });
                None
            }
        }
    }

    /// Exact-match member of a closed category.
    fn category<T: FromStr>(&mut self, field: &str, allowed: fn() -> Vec<&'static str>) -> Option<T> {
        let value = self.present(field)?;
        match value.as_str() {
            Some(s) => match s.parse::<T>() {
                Ok(v) => Some(v),
                Err(_) => {
                    self.reject(field, FieldIssue::NotAllowed { allowed: allowed() });
                    None
                }
            },
            None => {
                self.reject(field, FieldIssue::WrongType { expected: "string" });
                None
            }
        }
    }

    fn reject_unexpected(&mut self) {
        let unexpected: Vec<String> = self
            .body
            .keys()
            .filter(|k| !FEATURE_COLUMNS.contains(&k.as_str()))
            .cloned()
            .collect();
        for field in unexpected {
            self.reject(&field, FieldIssue::Unexpected);
        }
    }
}

/// Validates a raw request body into [`PropertyFeatures`].
///
/// Every field is checked before returning; on failure the error lists all
/// offending fields in column order, followed by any unexpected fields.
pub fn validate_payload(payload: &Value) -> Result<PropertyFeatures, ValidationError> {
    let body = payload.as_object().ok_or_else(|| ValidationError {
        errors: vec![FieldError {
            field: "body".to_string(),
            issue: FieldIssue::NotAnObject,
        }],
    })?;

    let mut r = FieldReader::new(body);

    let total_area_sqm = r.number("total_area_sqm", |v| v > 0.0, "greater than 0");
    let cadastral_income = r.number("cadastral_income", |v| v >= 0.0, "greater than or equal to 0");
    let primary_energy_consumption_sqm = r.number(
        "primary_energy_consumption_sqm",
        |v| v >= 0.0,
        "greater than or equal to 0",
    );
    let nbr_bedrooms = r.integer(
        "nbr_bedrooms",
        0,
        i64::from(u32::MAX),
        "an integer greater than or equal to 0",
    );
    let nbr_frontages = r.integer("nbr_frontages", 1, 4, "an integer between 1 and 4");
    let subproperty_type =
        r.category::<SubpropertyType>("subproperty_type", SubpropertyType::allowed_values);
    let province = r.category::<Province>("province", Province::allowed_values);
    let fl_terrace = r.boolean("fl_terrace");
    let fl_garden = r.boolean("fl_garden");
    let fl_swimming_pool = r.boolean("fl_swimming_pool");
    let fl_furnished = r.boolean("fl_furnished");
    let epc = r.category::<Epc>("epc", Epc::allowed_values);
    let equipped_kitchen =
        r.category::<EquippedKitchen>("equipped_kitchen", EquippedKitchen::allowed_values);
    let heating_type = r.category::<HeatingType>("heating_type", HeatingType::allowed_values);
    r.reject_unexpected();

    if !r.errors.is_empty() {
        return Err(ValidationError { errors: r.errors });
    }

    match (
        total_area_sqm,
        cadastral_income,
        primary_energy_consumption_sqm,
        nbr_bedrooms,
        nbr_frontages,
        subproperty_type,
        province,
        fl_terrace,
        fl_garden,
        fl_swimming_pool,
        fl_furnished,
        epc,
        equipped_kitchen,
        heating_type,
    ) {
        (
            Some(total_area_sqm),
            Some(cadastral_income),
            Some(primary_energy_consumption_sqm),
            Some(nbr_bedrooms),
            Some(nbr_frontages),
            Some(subproperty_type),
            Some(province),
            Some(fl_terrace),
            Some(fl_garden),
            Some(fl_swimming_pool),
            Some(fl_furnished),
            Some(epc),
            Some(equipped_kitchen),
            Some(heating_type),
        ) => Ok(PropertyFeatures {
            total_area_sqm,
            cadastral_income,
            primary_energy_consumption_sqm,
            // both ranges were checked by `integer`
            nbr_bedrooms: nbr_bedrooms as u32,
            nbr_frontages: nbr_frontages as u8,
            subproperty_type,
            province,
            fl_terrace,
            fl_garden,
            fl_swimming_pool,
            fl_furnished,
            epc,
            equipped_kitchen,
            heating_type,
        }),
        // every None pushed an error above
        _ => Err(ValidationError { errors: r.errors }),
    }
}
