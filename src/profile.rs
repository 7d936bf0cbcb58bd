//! Read-only view over the authenticated user's profile
//!
//! The profile is whatever JSON object the authorization server returned
//! from the user-info endpoint. [`UserProfile`] adds structured accessors
//! with stable fallbacks so presentation code never branches on absent
//! fields: missing strings come back empty, missing collections come back
//! empty, and timezone/locale fall back to the service-wide defaults.

use serde_json::Value;

/// Timezone assumed when the profile does not carry one.
pub const DEFAULT_TIMEZONE: &str = "Europe/Amsterdam";

/// Locale assumed when the profile does not carry one.
pub const DEFAULT_LOCALE: &str = "nl";

/// Read-only accessor over the cached profile JSON
///
/// # Examples
///
/// ```
/// use authflow::UserProfile;
/// use serde_json::json;
///
/// let profile = UserProfile::new(json!({
///     "first_name": "Anna",
///     "last_name_prefix": "van",
///     "last_name": "Dam",
/// }));
/// assert_eq!(profile.full_name(), "Anna van Dam");
/// assert_eq!(profile.last_name(true, true), "Dam, van");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    data: Value,
}

impl UserProfile {
    /// Wrap a profile JSON object
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// Whether the profile carries no fields
    pub fn is_empty(&self) -> bool {
        match &self.data {
            Value::Object(map) => map.is_empty(),
            _ => true,
        }
    }

    /// The underlying JSON, for fields without a dedicated accessor
    pub fn raw(&self) -> &Value {
        &self.data
    }

    /// User identifier
    pub fn id(&self) -> String {
        self.string_field("id")
    }

    /// Email address
    pub fn email(&self) -> String {
        self.string_field("email")
    }

    /// Initials, as stored
    pub fn initials(&self) -> String {
        self.string_field("initials")
    }

    /// First name
    pub fn first_name(&self) -> String {
        self.string_field("first_name")
    }

    /// Last name, composed from `last_name_prefix` and `last_name`
    ///
    /// With `with_prefix`, the prefix joins in front ("van Dam"); with
    /// `comma_separated` as well, the order reverses to "Dam, van". Absent
    /// parts are skipped, so no stray separators appear.
    pub fn last_name(&self, with_prefix: bool, comma_separated: bool) -> String {
        let prefix = self.string_field("last_name_prefix");
        let last = self.string_field("last_name");

        if !with_prefix || prefix.is_empty() {
            return last;
        }
        if last.is_empty() {
            return prefix;
        }
        if comma_separated {
            format!("{}, {}", last, prefix)
        } else {
            format!("{} {}", prefix, last)
        }
    }

    /// Display name
    ///
    /// Informal uses the first name ("Anna van Dam"); formal uses the
    /// initials ("A. van Dam").
    pub fn name(&self, formal: bool) -> String {
        let head = if formal {
            self.initials()
        } else {
            self.first_name()
        };
        let last = self.last_name(true, false);

        match (head.is_empty(), last.is_empty()) {
            (true, _) => last,
            (_, true) => head,
            _ => format!("{} {}", head, last),
        }
    }

    /// Formal display name (initials + last name)
    pub fn formal_name(&self) -> String {
        self.name(true)
    }

    /// Informal display name (first + last name)
    pub fn full_name(&self) -> String {
        self.name(false)
    }

    /// Localized salutation derived from `gender` and the profile locale
    ///
    /// Locale `nl` yields `heer`/`mevrouw`; other locales yield `Mr`/`Ms`.
    /// An absent or unrecognized gender falls back to the neutral form.
    pub fn title(&self) -> String {
        let dutch = self.locale() == "nl";
        match self.string_field("gender").as_str() {
            "M" => if dutch { "heer" } else { "Mr" }.to_string(),
            "F" => if dutch { "mevrouw" } else { "Ms" }.to_string(),
            _ => if dutch { "heer/mevrouw" } else { "Sir or Madam" }.to_string(),
        }
    }

    /// The `user_metadata` object, `{}` when absent
    pub fn user_metadata(&self) -> Value {
        self.object_field("user_metadata")
    }

    /// The `app_metadata` object, `{}` when absent
    pub fn app_metadata(&self) -> Value {
        self.object_field("app_metadata")
    }

    /// Timezone from `user_metadata`, with the service default fallback
    pub fn timezone(&self) -> String {
        self.user_metadata()
            .get("timezone")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_TIMEZONE)
            .to_string()
    }

    /// Locale from `user_metadata`, with the service default fallback
    pub fn locale(&self) -> String {
        self.user_metadata()
            .get("locale")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_LOCALE)
            .to_string()
    }

    /// Scopes recorded in `app_metadata`
    pub fn scopes(&self) -> Vec<String> {
        self.app_metadata()
            .get("scopes")
            .and_then(Value::as_array)
            .map(|scopes| {
                scopes
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Free-form attributes from `user_metadata`
    pub fn attributes(&self) -> Vec<Value> {
        self.metadata_array("attributes")
    }

    /// Professions from `user_metadata`
    pub fn professions(&self) -> Vec<Value> {
        self.metadata_array("professions")
    }

    /// Roles from `user_metadata`
    pub fn roles(&self) -> Vec<Value> {
        self.metadata_array("roles")
    }

    /// Postal addresses from `user_metadata`
    pub fn addresses(&self) -> Vec<Value> {
        self.metadata_array("addresses")
    }

    fn string_field(&self, key: &str) -> String {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn object_field(&self, key: &str) -> Value {
        match self.data.get(key) {
            Some(value @ Value::Object(_)) => value.clone(),
            _ => Value::Object(serde_json::Map::new()),
        }
    }

    fn metadata_array(&self, key: &str) -> Vec<Value> {
        self.user_metadata()
            .get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}
