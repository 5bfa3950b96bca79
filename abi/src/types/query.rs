use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use url::form_urlencoded;

use crate::{Error, ToSql, Validator, PAGE_SIZE};

const SORT_PARAM: &str = "sortBy";
const PAGE_PARAM: &str = "page";
/// Filter value that disables filtering.
pub const FILTER_ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    Time(DateTime<Utc>),
    List(Vec<String>),
}

/// Value of a record field as seen by the filter/sort engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(f64),
    Time(DateTime<Utc>),
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter<F> {
    pub field: F,
    pub op: Comparison,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortBy<F> {
    pub field: F,
    pub direction: Direction,
}

/// A field that query directives may filter or sort on, with its store mapping.
pub trait QueryField: Copy + fmt::Debug + PartialEq + FromStr<Err = Error> {
    /// Search parameter carrying this collection's filter selector.
    const FILTER_PARAM: &'static str;
    const TABLE: &'static str;
    const COLUMNS: &'static str;
    const DEFAULT_ORDER: &'static str;

    /// SQL expression the field is filtered on.
    fn column(self) -> &'static str;

    /// SQL expression the field is ordered by.
    fn sort_expr(self) -> &'static str {
        self.column()
    }

    /// Interpret the value of `FILTER_PARAM`. `Ok(None)` means no filtering.
    fn parse_filter(value: &str) -> Result<Option<Filter<Self>>, Error>;
}

/// A record the engine can filter and sort in memory.
pub trait Record {
    type Field: QueryField;

    fn value(&self, field: Self::Field) -> FieldValue<'_>;
}

/// Transient filter/sort/page instructions for one fetch.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(build_fn(name = "private_build"), setter(strip_option))]
pub struct QueryDirective<F: QueryField> {
    #[builder(default)]
    pub filter: Option<Filter<F>>,
    #[builder(default)]
    pub sort: Option<SortBy<F>>,
    #[builder(default)]
    pub page: Option<u32>,
}

impl<F: QueryField> QueryDirectiveBuilder<F> {
    pub fn build(&self) -> Result<QueryDirective<F>, Error> {
        let directive = self
            .private_build()
            .map_err(|e| Error::MissingField(e.to_string()))?;
        directive.validate()?;
        Ok(directive)
    }
}

impl<F: QueryField> Default for QueryDirective<F> {
    fn default() -> Self {
        Self {
            filter: None,
            sort: None,
            page: None,
        }
    }
}

impl<F: QueryField> Validator for QueryDirective<F> {
    fn validate(&self) -> Result<(), Error> {
        match self.page {
            Some(0) => Err(Error::InvalidPage("0".into())),
            _ => Ok(()),
        }
    }
}

impl<F: QueryField> QueryDirective<F> {
    /// Parse URL-style search params, keeping every fragment that parses and
    /// returning the rejected ones alongside. Params owned by other views are skipped.
    pub fn parse_lenient(query: &str) -> (Self, Vec<Error>) {
        let mut directive = Self::default();
        let mut rejected = Vec::new();

        let query = query.trim_start_matches('?');
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                SORT_PARAM => match value.parse::<SortBy<F>>() {
                    Ok(sort) => directive.sort = Some(sort),
                    Err(e) => rejected.push(e),
                },
                PAGE_PARAM => match value.parse::<u32>() {
                    Ok(page) if page >= 1 => directive.page = Some(page),
                    _ => rejected.push(Error::InvalidPage(value.into_owned())),
                },
                param if param == F::FILTER_PARAM => match F::parse_filter(&value) {
                    Ok(filter) => directive.filter = filter,
                    Err(e) => rejected.push(e),
                },
                _ => {}
            }
        }

        (directive, rejected)
    }

    /// Strict parse: the first rejected fragment fails the whole directive.
    pub fn from_search_params(query: &str) -> Result<Self, Error> {
        let (directive, rejected) = Self::parse_lenient(query);
        match rejected.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(directive),
        }
    }

    pub fn offset(&self) -> Option<u32> {
        self.page.map(|page| (page.max(1) - 1) * PAGE_SIZE)
    }

    /// Value bound to `$1` by the rendered SQL, if any.
    pub fn bind_value(&self) -> Option<&FilterValue> {
        self.filter.as_ref().map(|f| &f.value)
    }

    pub fn to_count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            F::TABLE,
            self.where_clause()
        )
    }

    fn where_clause(&self) -> String {
        match &self.filter {
            None => "TRUE".into(),
            Some(filter) => {
                let column = filter.field.column();
                match filter.op {
                    Comparison::Eq => format!("{} = $1", column),
                    Comparison::Gt => format!("{} > $1", column),
                    Comparison::Gte => format!("{} >= $1", column),
                    Comparison::Lt => format!("{} < $1", column),
                    Comparison::Lte => format!("{} <= $1", column),
                    Comparison::In => format!("{} = ANY($1)", column),
                }
            }
        }
    }

    fn order_clause(&self) -> String {
        match &self.sort {
            None => F::DEFAULT_ORDER.into(),
            Some(sort) => {
                // missing values first ascending, last descending, as in the engine
                let direction = match sort.direction {
                    Direction::Asc => "ASC NULLS FIRST",
                    Direction::Desc => "DESC NULLS LAST",
                };
                format!("{} {}, id ASC", sort.field.sort_expr(), direction)
            }
        }
    }
}

impl<F: QueryField> ToSql for QueryDirective<F> {
    fn to_sql(&self) -> String {
        let limit = match self.offset() {
            Some(offset) => format!(" LIMIT {} OFFSET {}", PAGE_SIZE, offset),
            None => String::new(),
        };
        format!(
            "SELECT {} FROM {} WHERE {} ORDER BY {}{}",
            F::COLUMNS,
            F::TABLE,
            self.where_clause(),
            self.order_clause(),
            limit
        )
    }
}

impl<F: QueryField> FromStr for SortBy<F> {
    type Err = Error;

    /// `field-direction`; `asc` sorts ascending and anything else descending.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = s.rsplit_once('-').unwrap_or((s, ""));
        let field = field
            .parse::<F>()
            .map_err(|_| Error::InvalidSortField(field.to_string()))?;
        let direction = if direction == "asc" {
            Direction::Asc
        } else {
            Direction::Desc
        };
        Ok(Self { field, direction })
    }
}
