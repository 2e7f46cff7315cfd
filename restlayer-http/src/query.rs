//! Translation of list request query strings into store queries.
//!
//! Every query parameter that is not a directive filters the collection. The
//! operator is carried by the parameter itself:
//!
//! | Parameter | Filter |
//! |---|---|
//! | `name=Bob` | equal |
//! | `name=Bob,Judy` | any of |
//! | `name!=Bob` | not equal (`!=a,b` is none of) |
//! | `age>18`, `age>=18`, `age<65`, `age<=65` | comparisons |
//! | `email` / `!email` | field exists / does not exist |
//! | `email=/example/` | contains (`/^bob/` starts with, `/.com$/` ends with) |
//!
//! The directives are `sort`, `fields`, `omit` and the window parameters of the
//! configured [`PaginationStyle`]. Values are typed before comparison: booleans,
//! null, numbers and RFC 3339 timestamps are recognized, anything else is a string.

use bson::Bson;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use restlayer_core::{
    key::{DocumentKey, KEY_FIELD, PUBLIC_KEY_FIELD},
    page::{PageLinks, PageWindow},
    query::{Expr, FieldOp, Filter, Projection, Query, Sort, SortDirection},
};

use crate::error::{RestError, Result};

/// Query parameter selecting the response envelope. Never a filter.
pub const ENVELOPE_PARAM: &str = "envelope";

const SORT_PARAM: &str = "sort";
const FIELDS_PARAM: &str = "fields";
const OMIT_PARAM: &str = "omit";

/// Vocabulary used to select a page of results.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStyle {
    /// `offset` and `limit` parameters.
    #[default]
    OffsetLimit,
    /// `page` (starting at 1) and `per_page` parameters.
    PageNumber,
}

impl PaginationStyle {
    fn params(&self) -> (&'static str, &'static str) {
        match self {
            PaginationStyle::OffsetLimit => ("offset", "limit"),
            PaginationStyle::PageNumber => ("page", "per_page"),
        }
    }
}

/// Pagination policy applied to list requests.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    #[serde(default)]
    pub style: PaginationStyle,
    /// Limit applied when the request does not set one.
    #[serde(default)]
    pub default_limit: Option<u64>,
    /// Upper bound of any limit, requested or default.
    #[serde(default)]
    pub max_limit: Option<u64>,
}

impl Pagination {
    fn window(&self, offset: Option<&str>, limit: Option<&str>) -> Result<PageWindow> {
        let (offset_param, limit_param) = self.style.params();

        let limit = match limit {
            Some(raw) => match parse_count(limit_param, raw)? {
                0 => return Err(RestError::bad_request(format!("{limit_param} must be greater than 0"))),
                limit => Some(limit),
            },
            None => self.default_limit,
        };
        let limit = match (limit, self.max_limit) {
            (Some(limit), Some(max)) => Some(limit.min(max)),
            (None, Some(max)) => Some(max),
            (limit, None) => limit,
        };

        let offset = match (self.style, offset) {
            (_, None) => 0,
            (PaginationStyle::OffsetLimit, Some(raw)) => parse_count(offset_param, raw)?,
            (PaginationStyle::PageNumber, Some(raw)) => match (parse_count(offset_param, raw)?, limit) {
                (0, _) => return Err(RestError::bad_request("page must be greater than 0")),
                (1, _) => 0,
                (page, Some(limit)) => (page - 1).saturating_mul(limit),
                (_, None) => return Err(RestError::bad_request("page requires per_page")),
            },
        };

        Ok(PageWindow::new(offset, limit))
    }

    /// Renders a window as its query parameters.
    fn params_of(&self, window: &PageWindow) -> Vec<(&'static str, u64)> {
        let (offset_param, limit_param) = self.style.params();
        let Some(limit) = window.limit else {
            return Vec::new();
        };

        match self.style {
            PaginationStyle::OffsetLimit => vec![(offset_param, window.offset), (limit_param, limit)],
            PaginationStyle::PageNumber => vec![(offset_param, window.offset / limit + 1), (limit_param, limit)],
        }
    }
}

/// Window values stay within the signed 64-bit range every backend accepts.
fn parse_count(param: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|count| i64::try_from(*count).is_ok())
        .ok_or_else(|| RestError::bad_request(format!("{param} must be a non-negative integer, got '{raw}'")))
}

/// A translated list request.
#[derive(Debug, Clone)]
pub struct ListQuery {
    query: Query,
    window: PageWindow,
    pagination: Pagination,
}

impl ListQuery {
    /// Translates decoded query parameters.
    ///
    /// The `envelope` parameter is skipped. Filters combine with a logical AND.
    pub fn parse(params: &[(String, String)], pagination: &Pagination) -> Result<Self> {
        let (offset_param, limit_param) = pagination.style.params();
        let mut filters = Vec::new();
        let mut sort = Vec::new();
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        let mut offset = None;
        let mut limit = None;

        for (key, value) in params {
            match key.as_str() {
                ENVELOPE_PARAM => {}
                SORT_PARAM => sort.extend(parse_sort(value)),
                FIELDS_PARAM => {
                    for field in split_list(value) {
                        match field.strip_prefix('-') {
                            Some(field) => exclude.push(store_field(field)),
                            None => include.push(store_field(field.trim_start_matches('+'))),
                        }
                    }
                }
                OMIT_PARAM => exclude.extend(split_list(value).map(store_field)),
                key if key == offset_param => offset = Some(value.as_str()),
                key if key == limit_param => limit = Some(value.as_str()),
                _ => filters.push(parse_filter(key, value)?),
            }
        }

        let projection = match (include.is_empty(), exclude.is_empty()) {
            (true, true) => None,
            (false, true) => Some(Projection::Include(include)),
            (true, false) => Some(Projection::Exclude(exclude)),
            (false, false) => {
                return Err(RestError::bad_request("fields cannot both include and exclude fields"));
            }
        };
        let filter = match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter::and(filters)),
        };
        let window = pagination.window(offset, limit)?;

        Ok(Self {
            query: Query {
                filter,
                limit: window.limit,
                offset: (window.offset > 0).then_some(window.offset),
                sort,
                projection,
            },
            window,
            pagination: *pagination,
        })
    }

    /// The filter shared by the count and the fetch.
    pub fn filter(&self) -> Option<&Expr> {
        self.query.filter.as_ref()
    }

    /// The store query, window included.
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn into_query(self) -> Query {
        self.query
    }

    /// The requested window.
    pub fn window(&self) -> PageWindow {
        self.window
    }

    /// Navigation windows given the total number of matches.
    pub fn links(&self, total: u64) -> PageLinks {
        self.window.links(total)
    }

    /// Builds the `Link` header value for the request `url`.
    ///
    /// Every query parameter of `url` is preserved except the window parameters,
    /// which are replaced by each relation's own. Returns `None` when there is no
    /// other page.
    pub fn link_header(&self, url: &str, total: u64) -> Option<String> {
        let links = self.links(total);
        if links.is_empty() {
            return None;
        }

        let (base, raw_query) = url.split_once('?').unwrap_or((url, ""));
        let (offset_param, limit_param) = self.pagination.style.params();
        let kept = raw_query
            .split('&')
            .filter(|segment| !segment.is_empty())
            .filter(|segment| {
                let name = segment.split_once('=').map_or(*segment, |(name, _)| name);
                name != offset_param && name != limit_param
            })
            .collect::<Vec<_>>();

        let header = links
            .relations()
            .map(|(rel, window)| {
                let params = kept
                    .iter()
                    .map(|segment| segment.to_string())
                    .chain(
                        self.pagination
                            .params_of(&window)
                            .into_iter()
                            .map(|(name, value)| format!("{name}={value}")),
                    )
                    .collect::<Vec<_>>()
                    .join("&");

                format!("<{base}?{params}>; rel=\"{rel}\"")
            })
            .collect::<Vec<_>>()
            .join(", ");

        Some(header)
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

/// Maps a public field name onto the stored one.
fn store_field(field: &str) -> String {
    match field {
        PUBLIC_KEY_FIELD => KEY_FIELD.to_string(),
        field => field.to_string(),
    }
}

fn parse_sort(value: &str) -> Vec<Sort> {
    split_list(value)
        .map(|key| match key.strip_prefix('-') {
            Some(field) => Sort { field: store_field(field), direction: SortDirection::Desc },
            None => Sort {
                field: store_field(key.trim_start_matches('+')),
                direction: SortDirection::Asc,
            },
        })
        .collect()
}

/// Translates one filter parameter.
///
/// Decoding splits `age>=18` into the key `age>` and the value `18`, and leaves
/// `age>18` whole as a key with an empty value, so the operator is recovered from
/// both halves.
fn parse_filter(key: &str, value: &str) -> Result<Expr> {
    if let Some(field) = key.strip_suffix('!') {
        return field_filter(field, Comparison::Ne, value);
    }
    if let Some(field) = key.strip_suffix('>') {
        return field_filter(field, Comparison::Gte, value);
    }
    if let Some(field) = key.strip_suffix('<') {
        return field_filter(field, Comparison::Lte, value);
    }

    if value.is_empty() {
        if let Some((field, bound)) = key.split_once('>') {
            return field_filter(field, Comparison::Gt, bound);
        }
        if let Some((field, bound)) = key.split_once('<') {
            return field_filter(field, Comparison::Lt, bound);
        }
        if let Some(field) = key.strip_prefix('!') {
            return Ok(Filter::not_exists(checked_field(field)?));
        }
        return Ok(Filter::exists(checked_field(key)?));
    }

    field_filter(key, Comparison::Eq, value)
}

#[derive(Clone, Copy)]
enum Comparison {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

fn checked_field(field: &str) -> Result<String> {
    let field = field.trim();

    if field.is_empty() || field.starts_with('$') {
        return Err(RestError::bad_request(format!("invalid filter field '{field}'")));
    }

    Ok(store_field(field))
}

fn field_filter(field: &str, comparison: Comparison, value: &str) -> Result<Expr> {
    let field = checked_field(field)?;
    let is_key = field == KEY_FIELD;

    if let Some(pattern) = value.strip_prefix('/').and_then(|v| v.strip_suffix('/')) {
        if !pattern.is_empty() {
            return text_filter(field, comparison, pattern);
        }
    }

    if value.contains(',') && matches!(comparison, Comparison::Eq | Comparison::Ne) {
        let values = value
            .split(',')
            .map(|item| typed_value(item, is_key))
            .collect::<Vec<_>>();

        return Ok(match comparison {
            Comparison::Eq => Filter::any_of(field, values),
            _ => Filter::none_of(field, values),
        });
    }

    let value = typed_value(value, is_key);

    Ok(match comparison {
        Comparison::Eq => Filter::eq(field, value),
        Comparison::Ne => Filter::ne(field, value),
        Comparison::Gt => Filter::gt(field, value),
        Comparison::Gte => Filter::gte(field, value),
        Comparison::Lt => Filter::lt(field, value),
        Comparison::Lte => Filter::lte(field, value),
    })
}

fn text_filter(field: String, comparison: Comparison, pattern: &str) -> Result<Expr> {
    let (anchored_start, pattern) = match pattern.strip_prefix('^') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };
    let (anchored_end, pattern) = match pattern.strip_suffix('$') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };

    let expr = match (anchored_start, anchored_end) {
        (true, false) => Filter::starts_with(field, pattern),
        (false, true) => Filter::ends_with(field, pattern),
        (false, false) => Filter::contains(field, pattern),
        (true, true) => Filter::eq(field, pattern),
    };

    match comparison {
        Comparison::Eq => Ok(expr),
        Comparison::Ne => Ok(match expr {
            Expr::Field { field, op: FieldOp::Contains, value } => {
                Filter::not_contains(field, value)
            }
            other => other.not(),
        }),
        _ => Err(RestError::bad_request("text patterns only support = and !=")),
    }
}

/// Types a raw parameter value.
///
/// Identifier values go through the document key codec instead.
fn typed_value(raw: &str, is_key: bool) -> Bson {
    if is_key {
        return DocumentKey::parse(raw).into();
    }

    match raw {
        "true" => return Bson::Boolean(true),
        "false" => return Bson::Boolean(false),
        "null" => return Bson::Null,
        _ => {}
    }

    if let Ok(int) = raw.parse::<i64>() {
        return match i32::try_from(int) {
            Ok(small) => Bson::Int32(small),
            Err(_) => Bson::Int64(int),
        };
    }
    if looks_numeric(raw) {
        if let Ok(float) = raw.parse::<f64>() {
            return Bson::Double(float);
        }
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Bson::DateTime(bson::DateTime::from_chrono(datetime.with_timezone(&Utc)));
    }

    Bson::String(raw.to_string())
}

// `f64::from_str` also accepts words such as "inf" and "NaN".
fn looks_numeric(raw: &str) -> bool {
    raw.bytes().any(|b| b.is_ascii_digit())
        && raw.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}
