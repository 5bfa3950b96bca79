//! In-memory filter/sort over an already fetched collection.

use std::cmp::Ordering;

use abi::{
    Comparison, Direction, FieldValue, Filter, FilterValue, QueryDirective, Record, SortBy,
    PAGE_SIZE,
};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Filter then sort `items` as the directive says. Pagination is left to [`paginate`].
pub fn apply<R: Record>(mut items: Vec<R>, directive: &QueryDirective<R::Field>) -> Vec<R> {
    if let Some(filter) = &directive.filter {
        items.retain(|item| matches(filter, item.value(filter.field)));
    }
    if let Some(sort) = &directive.sort {
        sort_by(&mut items, sort);
    }
    items
}

/// Stable sort: records comparing equal keep their fetch order.
pub fn sort_by<R: Record>(items: &mut [R], sort: &SortBy<R::Field>) {
    items.sort_by(|a, b| {
        let ord = compare(a.value(sort.field), b.value(sort.field));
        match sort.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    });
}

pub fn paginate<R>(items: Vec<R>, page: Option<u32>) -> Vec<R> {
    match page {
        None => items,
        Some(page) => {
            let skip = (page.max(1) - 1) as usize * PAGE_SIZE as usize;
            items.into_iter().skip(skip).take(PAGE_SIZE as usize).collect()
        }
    }
}

pub fn matches<F>(filter: &Filter<F>, value: FieldValue<'_>) -> bool {
    match (value, &filter.value) {
        (FieldValue::Text(a), FilterValue::List(list)) => {
            filter.op == Comparison::In && list.iter().any(|v| v == a)
        }
        (FieldValue::Text(a), FilterValue::Text(b)) => holds(filter.op, a.cmp(b.as_str())),
        (FieldValue::Number(a), FilterValue::Number(b)) => a
            .partial_cmp(b)
            .map(|ord| holds(filter.op, ord))
            .unwrap_or(false),
        (FieldValue::Time(a), FilterValue::Time(b)) => holds(filter.op, a.cmp(b)),
        _ => false,
    }
}

/// Text compares by base letter, ignoring case and accents. Numbers compare
/// numerically with NaN above every other number. A missing value orders
/// before any present one.
pub fn compare(a: FieldValue<'_>, b: FieldValue<'_>) -> Ordering {
    match (a, b) {
        (FieldValue::Missing, FieldValue::Missing) => Ordering::Equal,
        (FieldValue::Missing, _) => Ordering::Less,
        (_, FieldValue::Missing) => Ordering::Greater,
        (FieldValue::Text(a), FieldValue::Text(b)) => fold(a).cmp(fold(b)),
        (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(&b),
        (FieldValue::Time(a), FieldValue::Time(b)) => a.cmp(&b),
        _ => Ordering::Equal,
    }
}

// "Épilation" folds to "epilation"
fn fold(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

fn holds(op: Comparison, ord: Ordering) -> bool {
    match op {
        Comparison::Eq => ord == Ordering::Equal,
        Comparison::Gt => ord == Ordering::Greater,
        Comparison::Gte => ord != Ordering::Less,
        Comparison::Lt => ord == Ordering::Less,
        Comparison::Lte => ord != Ordering::Greater,
        Comparison::In => false,
    }
}
