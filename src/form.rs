use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Completed output of the appraisal wizard. Collected step by step by the
/// UI, consumed here as one value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppraisalForm {
    #[serde(default)]
    pub reference: Option<String>,
    pub address: Address,
    pub property: PropertyDetails,
    pub purpose: ValuationPurpose,
    #[serde(default)]
    pub contact: Option<Contact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub country_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDetails {
    pub kind: PropertyKind,
    #[serde(default)]
    pub year_built: Option<i32>,
    #[serde(default)]
    pub living_area_sqm: Option<f64>,
    #[serde(default)]
    pub plot_area_sqm: Option<f64>,
    #[serde(default)]
    pub rooms: Option<f64>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub amenities: Vec<Amenity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    House,
    Apartment,
    Plot,
}

impl PropertyKind {
    pub fn label(&self) -> &'static str {
        match self {
            PropertyKind::House => "House",
            PropertyKind::Apartment => "Apartment",
            PropertyKind::Plot => "Building plot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    Renovated,
    WellKept,
    NeedsWork,
}

impl Condition {
    pub fn label(&self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::Renovated => "Renovated",
            Condition::WellKept => "Well kept",
            Condition::NeedsWork => "Needs work",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Amenity {
    Garage,
    Balcony,
    Garden,
    Elevator,
    Basement,
    SolarPanels,
}

impl Amenity {
    pub fn label(&self) -> &'static str {
        match self {
            Amenity::Garage => "Garage",
            Amenity::Balcony => "Balcony",
            Amenity::Garden => "Garden",
            Amenity::Elevator => "Elevator",
            Amenity::Basement => "Basement",
            Amenity::SolarPanels => "Solar panels",
        }
    }

    /// Amenities that only make sense on a building, not on bare land.
    pub fn is_building_bound(&self) -> bool {
        matches!(
            self,
            Amenity::Balcony | Amenity::Elevator | Amenity::Basement | Amenity::SolarPanels
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationPurpose {
    MarketSale,
    Purchase,
    Financing,
    Insurance,
}

impl ValuationPurpose {
    pub fn label(&self) -> &'static str {
        match self {
            ValuationPurpose::MarketSale => "Market sale",
            ValuationPurpose::Purchase => "Purchase",
            ValuationPurpose::Financing => "Financing",
            ValuationPurpose::Insurance => "Insurance",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl AppraisalForm {
    /// Checks every rule and returns all violations, not just the first one.
    /// The wizard highlights fields individually, so issues carry the field
    /// path they belong to.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut issue = |field: &str, message: String| {
            issues.push(ValidationIssue {
                field: field.to_string(),
                message,
            });
        };

        if self.address.street.trim().is_empty() {
            issue("address.street", "must not be empty".into());
        }
        if self.address.city.trim().is_empty() {
            issue("address.city", "must not be empty".into());
        }
        let postal = self.address.postal_code.trim();
        if postal.len() < 3 || postal.len() > 10 {
            issue(
                "address.postal_code",
                "must be between 3 and 10 characters".into(),
            );
        } else if !postal
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ')
        {
            issue(
                "address.postal_code",
                "may only contain letters, digits and spaces".into(),
            );
        }
        let country = self.address.country_code.trim();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_uppercase()) {
            issue(
                "address.country_code",
                "must be a two-letter uppercase ISO code".into(),
            );
        }

        let p = &self.property;
        match p.kind {
            PropertyKind::House | PropertyKind::Apartment => {
                match p.living_area_sqm {
                    None => issue(
                        "property.living_area_sqm",
                        format!("is required for a {}", p.kind.label().to_lowercase()),
                    ),
                    Some(area) if !(10.0..=2000.0).contains(&area) => issue(
                        "property.living_area_sqm",
                        "must be between 10 and 2000".into(),
                    ),
                    Some(_) => {}
                }
                if p.kind == PropertyKind::Apartment && p.plot_area_sqm.is_some() {
                    issue(
                        "property.plot_area_sqm",
                        "is recorded for houses and plots, not apartments".into(),
                    );
                }
            }
            PropertyKind::Plot => {
                match p.plot_area_sqm {
                    None => issue("property.plot_area_sqm", "is required for a plot".into()),
                    Some(area) if !(1.0..=500_000.0).contains(&area) => issue(
                        "property.plot_area_sqm",
                        "must be between 1 and 500000".into(),
                    ),
                    Some(_) => {}
                }
                if p.year_built.is_some() {
                    issue("property.year_built", "does not apply to a plot".into());
                }
                if p.living_area_sqm.is_some() {
                    issue(
                        "property.living_area_sqm",
                        "does not apply to a plot".into(),
                    );
                }
                if p.rooms.is_some() {
                    issue("property.rooms", "does not apply to a plot".into());
                }
                if p.condition.is_some() {
                    issue("property.condition", "does not apply to a plot".into());
                }
                for amenity in p.amenities.iter().filter(|a| a.is_building_bound()) {
                    issue(
                        "property.amenities",
                        format!("{} does not apply to a plot", amenity.label()),
                    );
                }
            }
        }

        if let Some(year) = p.year_built {
            let max_year = Utc::now().year() + 1;
            if year < 1800 || year > max_year {
                issue(
                    "property.year_built",
                    format!("must be between 1800 and {max_year}"),
                );
            }
        }
        if let Some(rooms) = p.rooms
            && !(0.5..=100.0).contains(&rooms)
        {
            issue("property.rooms", "must be between 0.5 and 100".into());
        }
        if let Some(plot) = p.plot_area_sqm
            && p.kind == PropertyKind::House
            && !(1.0..=500_000.0).contains(&plot)
        {
            issue(
                "property.plot_area_sqm",
                "must be between 1 and 500000".into(),
            );
        }

        if let Some(contact) = &self.contact {
            if contact.name.trim().is_empty() {
                issue("contact.name", "must not be empty".into());
            }
            if let Some(email) = &contact.email
                && !email.contains('@')
            {
                issue("contact.email", "must be an email address".into());
            }
        }

        issues
    }

    /// Validation as a hard gate for the client paths: joins every issue into
    /// a single error message.
    pub fn ensure_valid(&self) -> AppResult<()> {
        let issues = self.validate();
        if issues.is_empty() {
            Ok(())
        } else {
            let joined = issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            Err(AppError::Validation(joined))
        }
    }

    /// Starter form for `valuation init-form` and the demo command.
    pub fn sample() -> Self {
        Self {
            reference: Some("SAMPLE-0001".to_string()),
            address: Address {
                street: "Lindenweg 12".to_string(),
                postal_code: "80331".to_string(),
                city: "München".to_string(),
                country_code: "DE".to_string(),
            },
            property: PropertyDetails {
                kind: PropertyKind::Apartment,
                year_built: Some(1987),
                living_area_sqm: Some(72.5),
                plot_area_sqm: None,
                rooms: Some(3.0),
                condition: Some(Condition::WellKept),
                amenities: vec![Amenity::Balcony, Amenity::Elevator],
            },
            purpose: ValuationPurpose::MarketSale,
            contact: Some(Contact {
                name: "Jordan Fischer".to_string(),
                email: Some("jordan.fischer@example.com".to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plot_form() -> AppraisalForm {
        AppraisalForm {
            reference: None,
            address: Address {
                street: "Feldweg 3".to_string(),
                postal_code: "04103".to_string(),
                city: "Leipzig".to_string(),
                country_code: "DE".to_string(),
            },
            property: PropertyDetails {
                kind: PropertyKind::Plot,
                year_built: None,
                living_area_sqm: None,
                plot_area_sqm: Some(640.0),
                rooms: None,
                condition: None,
                amenities: vec![],
            },
            purpose: ValuationPurpose::Purchase,
            contact: None,
        }
    }

    #[test]
    fn test_sample_form_is_valid() {
        assert!(AppraisalForm::sample().validate().is_empty());
    }

    #[test]
    fn test_plot_form_is_valid() {
        assert!(plot_form().validate().is_empty());
    }

    #[test]
    fn test_apartment_requires_living_area() {
        let mut form = AppraisalForm::sample();
        form.property.living_area_sqm = None;
        let issues = form.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "property.living_area_sqm");
        assert!(issues[0].message.contains("apartment"));
    }

    #[test]
    fn test_apartment_rejects_plot_area() {
        let mut form = AppraisalForm::sample();
        form.property.plot_area_sqm = Some(200.0);
        let issues = form.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "property.plot_area_sqm");
    }

    #[test]
    fn test_plot_rejects_building_fields() {
        let mut form = plot_form();
        form.property.year_built = Some(1990);
        form.property.living_area_sqm = Some(120.0);
        form.property.rooms = Some(4.0);
        form.property.condition = Some(Condition::New);
        form.property.amenities = vec![Amenity::Garage, Amenity::Balcony];
        let issues = form.validate();
        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert!(fields.contains(&"property.year_built"));
        assert!(fields.contains(&"property.living_area_sqm"));
        assert!(fields.contains(&"property.rooms"));
        assert!(fields.contains(&"property.condition"));
        // Garage is fine on a plot, Balcony is not.
        assert_eq!(
            issues
                .iter()
                .filter(|i| i.field == "property.amenities")
                .count(),
            1
        );
    }

    #[test]
    fn test_year_built_bounds() {
        let mut form = AppraisalForm::sample();
        form.property.year_built = Some(1750);
        assert_eq!(form.validate().len(), 1);

        form.property.year_built = Some(Utc::now().year() + 5);
        assert_eq!(form.validate().len(), 1);

        form.property.year_built = Some(Utc::now().year() + 1);
        assert!(form.validate().is_empty());
    }

    #[test]
    fn test_postal_code_rules() {
        let mut form = AppraisalForm::sample();
        form.address.postal_code = "8".to_string();
        assert_eq!(form.validate()[0].field, "address.postal_code");

        form.address.postal_code = "EC1A 1BB".to_string();
        assert!(form.validate().is_empty());

        form.address.postal_code = "80-331!".to_string();
        assert_eq!(form.validate()[0].field, "address.postal_code");
    }

    #[test]
    fn test_country_code_rules() {
        let mut form = AppraisalForm::sample();
        form.address.country_code = "de".to_string();
        assert_eq!(form.validate()[0].field, "address.country_code");

        form.address.country_code = "DEU".to_string();
        assert_eq!(form.validate()[0].field, "address.country_code");
    }

    #[test]
    fn test_validation_aggregates_issues() {
        let mut form = AppraisalForm::sample();
        form.address.street = "  ".to_string();
        form.address.city = String::new();
        form.property.living_area_sqm = Some(5.0);
        let issues = form.validate();
        assert_eq!(issues.len(), 3);
    }

    #[test]
    fn test_ensure_valid_joins_messages() {
        let mut form = AppraisalForm::sample();
        form.address.street = String::new();
        form.property.rooms = Some(400.0);
        let err = form.ensure_valid().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("address.street"));
        assert!(message.contains("property.rooms"));
    }

    #[test]
    fn test_serde_snake_case_enums() {
        let json = serde_json::to_value(AppraisalForm::sample()).unwrap();
        assert_eq!(json["property"]["kind"], "apartment");
        assert_eq!(json["purpose"], "market_sale");
        assert_eq!(json["property"]["amenities"][0], "balcony");

        let form: AppraisalForm = serde_json::from_value(json).unwrap();
        assert_eq!(form.property.kind, PropertyKind::Apartment);
    }

    #[test]
    fn test_form_loads_without_optional_fields() {
        let raw = r#"{
            "address": {"street": "Hafenstr. 1", "postal_code": "20457", "city": "Hamburg", "country_code": "DE"},
            "property": {"kind": "house", "living_area_sqm": 140.0, "plot_area_sqm": 420.0},
            "purpose": "financing"
        }"#;
        let form: AppraisalForm = serde_json::from_str(raw).unwrap();
        assert!(form.reference.is_none());
        assert!(form.contact.is_none());
        assert!(form.property.amenities.is_empty());
        assert!(form.validate().is_empty());
    }
}
