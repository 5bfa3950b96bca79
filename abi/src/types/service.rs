use std::str::FromStr;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    Comparison, Error, FieldValue, Filter, FilterValue, Normalizer, QueryDirective,
    QueryDirectiveBuilder, QueryField, Record, ServiceId, Validator, FILTER_ALL,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub duration_minutes: i32,
    pub regular_price: f64,
    pub category: String,
    pub discount: Option<f64>,
    pub image: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(build_fn(name = "private_build"), setter(into))]
pub struct NewService {
    pub name: String,
    pub duration_minutes: i32,
    pub regular_price: f64,
    #[builder(default)]
    pub category: String,
    #[builder(default, setter(strip_option))]
    pub discount: Option<f64>,
    #[builder(default, setter(strip_option))]
    pub image: Option<String>,
    #[builder(default, setter(strip_option))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regular_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
}

pub type ServiceQuery = QueryDirective<ServiceField>;
pub type ServiceQueryBuilder = QueryDirectiveBuilder<ServiceField>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceField {
    Name,
    Category,
    Duration,
    RegularPrice,
    Discount,
}

const NO_DISCOUNT: &str = "no-discount";
const WITH_DISCOUNT: &str = "with-discount";

fn check_service(duration: i32, price: f64, discount: Option<f64>) -> Result<(), Error> {
    if duration <= 0 {
        return Err(Error::InvalidService("duration must be positive"));
    }
    if !(price.is_finite() && price > 0.0) {
        return Err(Error::InvalidService("price must be positive"));
    }
    if let Some(discount) = discount {
        if !(0.0..=price).contains(&discount) {
            return Err(Error::InvalidService(
                "discount must be between zero and the regular price",
            ));
        }
    }
    Ok(())
}

impl Service {
    /// A new service carrying this one's fields, named `Copy of <name>`.
    pub fn duplicate(&self) -> NewService {
        NewService {
            name: format!("Copy of {}", self.name),
            duration_minutes: self.duration_minutes,
            regular_price: self.regular_price,
            category: self.category.clone(),
            discount: self.discount,
            image: self.image.clone(),
            description: self.description.clone(),
        }
    }
}

impl Validator for Service {
    fn validate(&self) -> Result<(), Error> {
        check_service(self.duration_minutes, self.regular_price, self.discount)
    }
}

impl NewServiceBuilder {
    pub fn build(&self) -> Result<NewService, Error> {
        let service = self
            .private_build()
            .map_err(|e| Error::MissingField(e.to_string()))?;
        service.validate()?;
        Ok(service)
    }
}

impl Validator for NewService {
    fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidService("name must not be empty"));
        }
        check_service(self.duration_minutes, self.regular_price, self.discount)
    }
}

impl Normalizer for NewService {
    fn do_normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.category = self.category.trim().to_string();
        // blank optional text is stored as NULL
        for text in [&mut self.image, &mut self.description] {
            if matches!(text, Some(t) if t.trim().is_empty()) {
                *text = None;
            }
        }
    }
}

impl ServicePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Checks each patched field on its own. The discount against the stored
/// price is enforced by the store, since only one side may be patched.
impl Validator for ServicePatch {
    fn validate(&self) -> Result<(), Error> {
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(Error::InvalidService("name must not be empty"));
        }
        if matches!(self.duration_minutes, Some(d) if d <= 0) {
            return Err(Error::InvalidService("duration must be positive"));
        }
        if matches!(self.regular_price, Some(p) if !(p.is_finite() && p > 0.0)) {
            return Err(Error::InvalidService("price must be positive"));
        }
        if let Some(Some(discount)) = self.discount {
            let max = self.regular_price.unwrap_or(f64::INFINITY);
            if !(discount.is_finite() && (0.0..=max).contains(&discount)) {
                return Err(Error::InvalidService(
                    "discount must be between zero and the regular price",
                ));
            }
        }
        Ok(())
    }
}

impl FromStr for ServiceField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(ServiceField::Name),
            "category" => Ok(ServiceField::Category),
            "duration" => Ok(ServiceField::Duration),
            "regularPrice" => Ok(ServiceField::RegularPrice),
            "discount" => Ok(ServiceField::Discount),
            _ => Err(Error::InvalidSortField(s.to_string())),
        }
    }
}

impl QueryField for ServiceField {
    const FILTER_PARAM: &'static str = "discount";
    const TABLE: &'static str = "services";
    const COLUMNS: &'static str =
        "id, name, duration_minutes, regular_price, category, discount, image, description";
    const DEFAULT_ORDER: &'static str = "id ASC";

    fn column(self) -> &'static str {
        match self {
            ServiceField::Name => "name",
            ServiceField::Category => "category",
            ServiceField::Duration => "duration_minutes",
            ServiceField::RegularPrice => "regular_price",
            ServiceField::Discount => "COALESCE(discount, 0)",
        }
    }

    fn sort_expr(self) -> &'static str {
        match self {
            ServiceField::Name => r#"name COLLATE "und-x-icu""#,
            ServiceField::Category => r#"category COLLATE "und-x-icu""#,
            other => other.column(),
        }
    }

    fn parse_filter(value: &str) -> Result<Option<Filter<Self>>, Error> {
        let op = match value {
            FILTER_ALL => return Ok(None),
            NO_DISCOUNT => Comparison::Eq,
            WITH_DISCOUNT => Comparison::Gt,
            _ => {
                return Err(Error::InvalidFilter {
                    param: Self::FILTER_PARAM.into(),
                    value: value.into(),
                })
            }
        };
        Ok(Some(Filter {
            field: ServiceField::Discount,
            op,
            value: FilterValue::Number(0.0),
        }))
    }
}

impl Record for Service {
    type Field = ServiceField;

    fn value(&self, field: ServiceField) -> FieldValue<'_> {
        match field {
            ServiceField::Name => FieldValue::Text(&self.name),
            ServiceField::Category => FieldValue::Text(&self.category),
            ServiceField::Duration => FieldValue::Number(self.duration_minutes as f64),
            ServiceField::RegularPrice => FieldValue::Number(self.regular_price),
            ServiceField::Discount => FieldValue::Number(self.discount.unwrap_or(0.0)),
        }
    }
}
