//! Table-filter query parameters for the user list.
//!
//! Query strings arrive as raw text in [`UserListParams`] and are decoded
//! into a [`UserListQuery`], which knows how to express itself as record
//! store [`Criteria`] and [`ReadOptions`]. Decoding reports every bad
//! parameter at once as a [`SchemaValidationError`].

use chrono::{DateTime, SecondsFormat, Utc};
use pagination::{ALLOWED_PAGE_SIZES, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, PageRequest};
use serde::Deserialize;
use serde_json::{Value, json};
use utoipa::IntoParams;

use super::data_access::{Condition, Criteria, OrderBy, ReadOptions, SortDirection};
use super::failure::{IssueCode, PathSegment, SchemaValidationError, ValidationIssue};
use super::user::{UserId, UserRole};

/// Fields a list may be sorted by.
pub const SORTABLE_FIELDS: [&str; 7] = [
    "createdAt",
    "updatedAt",
    "email",
    "firstName",
    "lastName",
    "role",
    "isActive",
];

/// Fields matched by the free-text `search` parameter.
pub const SEARCHABLE_FIELDS: [&str; 3] = ["firstName", "lastName", "email"];

const DEFAULT_SORT: &str = "createdAt";

/// Raw query string of `GET /users`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserListParams {
    /// Page number, starting at 1.
    pub page: Option<String>,
    /// One of 10, 25, 50 or 100.
    pub page_size: Option<String>,
    /// Case-insensitive match on first name, last name or email.
    pub search: Option<String>,
    /// Sort field; a leading `-` sorts descending, e.g. `-email`.
    pub sort: Option<String>,
    /// `asc` or `desc`; ignored when `sort` carries a `-` prefix.
    pub sort_direction: Option<String>,
    /// `ADMIN` or `USER`.
    pub role: Option<String>,
    /// Comma-separated user ids.
    pub ids: Option<String>,
    /// Two RFC 3339 instants separated by a comma.
    pub created_between: Option<String>,
    /// `true`, `1` or `yes` select active users; any other value inactive.
    pub active: Option<String>,
}

/// Inclusive creation-time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedBetween {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Decoded list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListQuery {
    pub page: PageRequest,
    pub search: Option<String>,
    pub sort: String,
    pub direction: SortDirection,
    pub role: Option<UserRole>,
    pub ids: Vec<UserId>,
    pub created_between: Option<CreatedBetween>,
    pub active: Option<bool>,
}

impl Default for UserListQuery {
    fn default() -> Self {
        Self {
            page: PageRequest::default(),
            search: None,
            sort: DEFAULT_SORT.to_owned(),
            direction: SortDirection::Desc,
            role: None,
            ids: Vec::new(),
            created_between: None,
            active: None,
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn push(issues: &mut Vec<ValidationIssue>, field: &str, code: IssueCode, message: String) {
    issues.push(ValidationIssue::field(field, code, message));
}

impl TryFrom<UserListParams> for UserListQuery {
    type Error = SchemaValidationError;

    fn try_from(params: UserListParams) -> Result<Self, Self::Error> {
        let mut issues = Vec::new();
        let mut query = Self::default();

        let page = match non_empty(params.page.as_ref()).map(str::parse::<u32>) {
            None => DEFAULT_PAGE,
            Some(Ok(page)) if page >= 1 => page,
            Some(_) => {
                push(
                    &mut issues,
                    "page",
                    IssueCode::TooSmall,
                    "page must be an integer greater than or equal to 1".into(),
                );
                DEFAULT_PAGE
            }
        };
        let page_size = match non_empty(params.page_size.as_ref()).map(str::parse::<u32>) {
            None => DEFAULT_PAGE_SIZE,
            Some(Ok(size)) if ALLOWED_PAGE_SIZES.contains(&size) => size,
            Some(_) => {
                let allowed = ALLOWED_PAGE_SIZES.map(|size| size.to_string()).join(", ");
                push(
                    &mut issues,
                    "pageSize",
                    IssueCode::InvalidEnumValue,
                    format!("pageSize must be one of {allowed}"),
                );
                DEFAULT_PAGE_SIZE
            }
        };
        // Both values are validated above; the fallback is unreachable.
        query.page = PageRequest::new(page, page_size).unwrap_or_default();

        query.search = non_empty(params.search.as_ref()).map(str::to_owned);

        if let Some(raw) = non_empty(params.sort_direction.as_ref()) {
            match raw.to_ascii_lowercase().as_str() {
                "asc" => query.direction = SortDirection::Asc,
                "desc" => query.direction = SortDirection::Desc,
                _ => push(
                    &mut issues,
                    "sortDirection",
                    IssueCode::InvalidEnumValue,
                    format!("Invalid enum value. Expected 'asc' | 'desc', received '{raw}'"),
                ),
            }
        }
        if let Some(raw) = non_empty(params.sort.as_ref()) {
            let (field, descending) = match raw.strip_prefix('-') {
                Some(field) => (field, true),
                None => (raw, false),
            };
            if SORTABLE_FIELDS.contains(&field) {
                query.sort = field.to_owned();
                if descending {
                    query.direction = SortDirection::Desc;
                }
            } else {
                push(
                    &mut issues,
                    "sort",
                    IssueCode::InvalidEnumValue,
                    format!(
                        "Cannot sort by '{field}'. Expected one of {}",
                        SORTABLE_FIELDS.join(", ")
                    ),
                );
            }
        }

        if let Some(raw) = non_empty(params.role.as_ref()) {
            match raw.parse::<UserRole>() {
                Ok(role) => query.role = Some(role),
                Err(_) => push(
                    &mut issues,
                    "role",
                    IssueCode::InvalidEnumValue,
                    format!("Invalid enum value. Expected 'ADMIN' | 'USER', received '{raw}'"),
                ),
            }
        }

        if let Some(raw) = non_empty(params.ids.as_ref()) {
            for (index, part) in raw.split(',').map(str::trim).enumerate() {
                if part.is_empty() {
                    continue;
                }
                match UserId::parse(part) {
                    Ok(id) => query.ids.push(id),
                    Err(_) => issues.push(ValidationIssue::new(
                        [PathSegment::from("ids"), PathSegment::from(index)],
                        IssueCode::InvalidString,
                        format!("Invalid uuid '{part}'"),
                    )),
                }
            }
        }

        if let Some(raw) = non_empty(params.created_between.as_ref()) {
            match parse_range(raw) {
                Some(range) => query.created_between = Some(range),
                None => push(
                    &mut issues,
                    "createdBetween",
                    IssueCode::InvalidDate,
                    "createdBetween must be two ISO-8601 instants separated by a comma".into(),
                ),
            }
        }

        query.active = non_empty(params.active.as_ref())
            .map(|raw| matches!(raw.to_ascii_lowercase().as_str(), "true" | "1" | "yes"));

        if issues.is_empty() {
            Ok(query)
        } else {
            Err(SchemaValidationError::new(issues))
        }
    }
}

fn parse_range(raw: &str) -> Option<CreatedBetween> {
    let (start, end) = raw.split_once(',')?;
    let start = DateTime::parse_from_rfc3339(start.trim()).ok()?;
    let end = DateTime::parse_from_rfc3339(end.trim()).ok()?;
    Some(CreatedBetween {
        start: start.with_timezone(&Utc),
        end: end.with_timezone(&Utc),
    })
}

fn instant(value: DateTime<Utc>) -> Value {
    json!(value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl UserListQuery {
    /// Filter expressing the search, role, ids, window and active flags.
    ///
    /// # Examples
    /// ```
    /// use b2b_api::domain::{UserListParams, UserListQuery};
    ///
    /// let params = UserListParams {
    ///     role: Some("ADMIN".into()),
    ///     ..UserListParams::default()
    /// };
    /// let query = UserListQuery::try_from(params).expect("valid params");
    /// assert!(query.criteria().condition("role").is_some());
    /// ```
    pub fn criteria(&self) -> Criteria {
        let mut criteria = Criteria::new();
        if let Some(role) = self.role {
            criteria = criteria.with_condition("role", Condition::Equals(json!(role.as_str())));
        }
        if !self.ids.is_empty() {
            let ids = self.ids.iter().map(|id| json!(id.to_string())).collect();
            criteria = criteria.with_condition("id", Condition::In(ids));
        }
        if let Some(range) = self.created_between {
            criteria = criteria.with_condition(
                "createdAt",
                Condition::Range {
                    gte: Some(instant(range.start)),
                    lte: Some(instant(range.end)),
                },
            );
        }
        if let Some(active) = self.active {
            criteria = criteria.with_condition("isActive", Condition::Equals(json!(active)));
        }
        if let Some(search) = &self.search {
            criteria = criteria.with_any(
                SEARCHABLE_FIELDS
                    .iter()
                    .map(|field| ((*field).to_owned(), Condition::Contains(search.clone())))
                    .collect(),
            );
        }
        criteria
    }

    /// Ordering and window for the requested page.
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            order_by: vec![OrderBy::new(self.sort.clone(), self.direction)],
            skip: Some(self.page.offset()),
            take: Some(self.page.limit()),
        }
    }
}
