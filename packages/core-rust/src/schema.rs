//! Resource descriptors: the closed field table of each entity kind.
//!
//! A [`ResourceDescriptor`] names the REST path segment of a resource kind and
//! declares every editable field together with its [`FieldKind`]. Descriptors
//! are checked when they are built, so the editor and the codec can rely on
//! field names being unique and display metadata pointing at real fields.

use std::collections::HashSet;

use serde_json::Value;

use crate::dates;
use crate::error::{SchemaError, ValidationError};
use crate::types::EntityRecord;

/// Grammatical gender of a resource noun, used to build user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Feminine,
    Masculine,
}

/// Portuguese singular/plural nouns naming a resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Noun {
    pub singular: &'static str,
    pub plural: &'static str,
    pub gender: Gender,
}

impl Noun {
    #[must_use]
    pub const fn feminine(singular: &'static str, plural: &'static str) -> Self {
        Self {
            singular,
            plural,
            gender: Gender::Feminine,
        }
    }

    #[must_use]
    pub const fn masculine(singular: &'static str, plural: &'static str) -> Self {
        Self {
            singular,
            plural,
            gender: Gender::Masculine,
        }
    }

    /// Singular noun preceded by its definite article ("a venda", "o veículo").
    #[must_use]
    pub fn with_article(&self) -> String {
        match self.gender {
            Gender::Feminine => format!("a {}", self.singular),
            Gender::Masculine => format!("o {}", self.singular),
        }
    }
}

/// Kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Single-line text.
    Text,
    /// Multi-line text.
    LongText,
    /// Numeric value; `null` when left empty.
    Number,
    /// Checkbox.
    Bool,
    /// Calendar date held as `YYYY-MM-DD`.
    Date {
        /// New records start with today's date instead of an empty value.
        defaults_to_now: bool,
    },
    /// One of a fixed set of text options.
    Choice(&'static [&'static str]),
    /// Foreign key to another resource kind, edited through a dropdown.
    Reference {
        /// Path segment of the referenced resource kind.
        resource: &'static str,
    },
}

impl FieldKind {
    /// Value a field of this kind starts with on a new record.
    ///
    /// `today` is the canonical form of the current date and is only used by
    /// date fields that default to now.
    #[must_use]
    pub fn default_value(&self, today: &str) -> Value {
        match self {
            Self::Text | Self::LongText | Self::Choice(_) => Value::String(String::new()),
            Self::Bool => Value::Bool(false),
            Self::Number | Self::Reference { .. } => Value::Null,
            Self::Date { defaults_to_now } => {
                if *defaults_to_now {
                    Value::String(today.to_string())
                } else {
                    Value::String(String::new())
                }
            }
        }
    }

    /// Short description used in validation messages.
    #[must_use]
    pub fn expected(&self) -> &'static str {
        match self {
            Self::Text | Self::LongText => "text",
            Self::Number => "a number",
            Self::Bool => "a true/false flag",
            Self::Date { .. } => "a YYYY-MM-DD date",
            Self::Choice(_) => "one of the listed options",
            Self::Reference { .. } => "a record identifier",
        }
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference { .. })
    }

    #[must_use]
    pub fn is_date(&self) -> bool {
        matches!(self, Self::Date { .. })
    }
}

/// Raw input for a field, as it comes from a form control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldInput {
    /// Text typed or selected by the user. For references, an identifier.
    Text(String),
    /// Checkbox state.
    Flag(bool),
}

impl From<&str> for FieldInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FieldInput {
    fn from(b: bool) -> Self {
        Self::Flag(b)
    }
}

/// Single field definition within a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// JSON key of the field.
    pub name: &'static str,
    /// Form label shown next to the input.
    pub label: &'static str,
    pub kind: FieldKind,
}

impl FieldDef {
    #[must_use]
    pub const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self { name, label, kind }
    }

    #[must_use]
    pub const fn text(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    #[must_use]
    pub const fn long_text(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::LongText)
    }

    #[must_use]
    pub const fn number(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::Number)
    }

    #[must_use]
    pub const fn flag(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::Bool)
    }

    #[must_use]
    pub const fn date(name: &'static str, label: &'static str) -> Self {
        Self::new(
            name,
            label,
            FieldKind::Date {
                defaults_to_now: false,
            },
        )
    }

    #[must_use]
    pub const fn date_defaulting_to_now(name: &'static str, label: &'static str) -> Self {
        Self::new(
            name,
            label,
            FieldKind::Date {
                defaults_to_now: true,
            },
        )
    }

    #[must_use]
    pub const fn choice(
        name: &'static str,
        label: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        Self::new(name, label, FieldKind::Choice(options))
    }

    #[must_use]
    pub const fn reference(
        name: &'static str,
        label: &'static str,
        resource: &'static str,
    ) -> Self {
        Self::new(name, label, FieldKind::Reference { resource })
    }

    /// Key under which some backends flatten this reference (`usuario` -> `idUsuario`).
    #[must_use]
    pub fn flat_reference_key(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => format!("id{}{}", first.to_uppercase(), chars.as_str()),
            None => "id".to_string(),
        }
    }

    /// Converts form input into the value held in edit state.
    ///
    /// Reference fields are resolved by the editor against its auxiliary
    /// collections and are not handled here.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the input does not fit the field kind.
    pub fn coerce(&self, input: FieldInput) -> Result<Value, ValidationError> {
        let mismatch = || ValidationError::KindMismatch {
            field: self.name.to_string(),
            expected: self.kind.expected(),
        };
        match (self.kind, input) {
            (FieldKind::Bool, FieldInput::Flag(b)) => Ok(Value::Bool(b)),
            (FieldKind::Bool, FieldInput::Text(s)) => match s.trim() {
                "true" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "off" | "0" | "" => Ok(Value::Bool(false)),
                _ => Err(mismatch()),
            },
            (FieldKind::Text | FieldKind::LongText, FieldInput::Text(s)) => Ok(Value::String(s)),
            (FieldKind::Number, FieldInput::Text(s)) => coerce_number(self.name, &s),
            (FieldKind::Date { .. }, FieldInput::Text(s)) => {
                if s.trim().is_empty() {
                    return Ok(Value::String(String::new()));
                }
                dates::parse_canonical(&s)
                    .map(|d| Value::String(dates::format_date(d)))
                    .ok_or_else(|| ValidationError::InvalidDate {
                        field: self.name.to_string(),
                        input: s,
                    })
            }
            (FieldKind::Choice(options), FieldInput::Text(s)) => {
                if s.is_empty() || options.contains(&s.as_str()) {
                    Ok(Value::String(s))
                } else {
                    Err(ValidationError::InvalidChoice {
                        field: self.name.to_string(),
                        input: s,
                    })
                }
            }
            _ => Err(mismatch()),
        }
    }
}

fn coerce_number(field: &str, input: &str) -> Result<Value, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    let invalid = || ValidationError::InvalidNumber {
        field: field.to_string(),
        input: input.to_string(),
    };
    if let Ok(int) = trimmed.parse::<i64>() {
        return Ok(Value::from(int));
    }
    let float: f64 = trimmed.parse().map_err(|_| invalid())?;
    serde_json::Number::from_f64(float)
        .map(Value::Number)
        .ok_or_else(invalid)
}

/// Static description of one resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    name: &'static str,
    noun: Noun,
    fields: Vec<FieldDef>,
    option_label: Vec<&'static str>,
    list_columns: Vec<&'static str>,
}

impl ResourceDescriptor {
    /// Starts a descriptor for the resource served under `/{name}`.
    #[must_use]
    pub fn builder(name: &'static str, noun: Noun) -> ResourceDescriptorBuilder {
        ResourceDescriptorBuilder {
            name,
            noun,
            fields: Vec::new(),
            option_label: Vec::new(),
            list_columns: Vec::new(),
        }
    }

    /// REST path segment, e.g. `veiculos`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn noun(&self) -> &Noun {
        &self.noun
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a field, rejecting names outside the closed field table.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::IdentifierReadOnly`] for `id` and
    /// [`ValidationError::UnknownField`] for anything undeclared.
    pub fn require_field(&self, name: &str) -> Result<&FieldDef, ValidationError> {
        if name == "id" {
            return Err(ValidationError::IdentifierReadOnly);
        }
        self.field(name).ok_or_else(|| ValidationError::UnknownField {
            resource: self.name.to_string(),
            field: name.to_string(),
        })
    }

    /// Reference fields paired with the resource kind each one points at.
    pub fn references(&self) -> impl Iterator<Item = (&FieldDef, &'static str)> {
        self.fields.iter().filter_map(|f| match f.kind {
            FieldKind::Reference { resource } => Some((f, resource)),
            _ => None,
        })
    }

    /// Resource kinds that must be loaded to populate this kind's dropdowns,
    /// in declaration order and without duplicates.
    #[must_use]
    pub fn auxiliary_resources(&self) -> Vec<&'static str> {
        let mut seen = HashSet::new();
        self.references()
            .map(|(_, resource)| resource)
            .filter(|resource| seen.insert(*resource))
            .collect()
    }

    /// A fresh record with every declared field at its default value.
    #[must_use]
    pub fn blank_record(&self, today: &str) -> EntityRecord {
        let mut record = EntityRecord::new();
        for field in &self.fields {
            record.set(field.name, field.kind.default_value(today));
        }
        record
    }

    /// Columns shown in the list view. Always starts with `id`.
    #[must_use]
    pub fn list_columns(&self) -> &[&'static str] {
        &self.list_columns
    }

    /// Text that identifies `record` in a reference dropdown, e.g. `"Gol - ABC1D23"`.
    ///
    /// Falls back to `#id` when none of the label fields hold text.
    #[must_use]
    pub fn option_label(&self, record: &EntityRecord) -> String {
        let parts: Vec<String> = self
            .option_label
            .iter()
            .filter_map(|name| record.get(name))
            .filter_map(display_scalar)
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            record
                .id()
                .map_or_else(|| "(novo)".to_string(), |id| format!("#{id}"))
        } else {
            parts.join(" - ")
        }
    }
}

/// Renders a scalar JSON value for display; `None` for null and containers.
#[must_use]
pub fn display_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("Sim".to_string()),
        Value::Bool(false) => Some("Não".to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Builder returned by [`ResourceDescriptor::builder`].
#[derive(Debug)]
pub struct ResourceDescriptorBuilder {
    name: &'static str,
    noun: Noun,
    fields: Vec<FieldDef>,
    option_label: Vec<&'static str>,
    list_columns: Vec<&'static str>,
}

impl ResourceDescriptorBuilder {
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Fields joined with `" - "` to label a record in dropdowns.
    #[must_use]
    pub fn option_label(mut self, fields: &[&'static str]) -> Self {
        self.option_label = fields.to_vec();
        self
    }

    /// Columns of the list view after `id`. Defaults to every declared field.
    #[must_use]
    pub fn list_columns(mut self, fields: &[&'static str]) -> Self {
        self.list_columns = fields.to_vec();
        self
    }

    /// Validates the field table and produces the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] on an empty resource name, duplicate or
    /// reserved field names, references without a target, choices without
    /// options, or display metadata naming undeclared fields.
    pub fn build(self) -> Result<ResourceDescriptor, SchemaError> {
        let resource = self.name;
        if resource.trim().is_empty() {
            return Err(SchemaError::EmptyResourceName);
        }

        let mut names = HashSet::new();
        for field in &self.fields {
            if field.name == "id" || field.name.is_empty() {
                return Err(SchemaError::ReservedField {
                    resource: resource.to_string(),
                    field: field.name.to_string(),
                });
            }
            if !names.insert(field.name) {
                return Err(SchemaError::DuplicateField {
                    resource: resource.to_string(),
                    field: field.name.to_string(),
                });
            }
            match field.kind {
                FieldKind::Reference { resource: target } if target.trim().is_empty() => {
                    return Err(SchemaError::EmptyReference {
                        resource: resource.to_string(),
                        field: field.name.to_string(),
                    });
                }
                FieldKind::Choice([]) => {
                    return Err(SchemaError::EmptyChoice {
                        resource: resource.to_string(),
                        field: field.name.to_string(),
                    });
                }
                _ => {}
            }
        }

        for name in self.option_label.iter().chain(self.list_columns.iter()) {
            if !names.contains(name) {
                return Err(SchemaError::UnknownDisplayField {
                    resource: resource.to_string(),
                    field: (*name).to_string(),
                });
            }
        }

        let mut list_columns = vec!["id"];
        if self.list_columns.is_empty() {
            list_columns.extend(self.fields.iter().map(|f| f.name));
        } else {
            list_columns.extend(self.list_columns);
        }

        Ok(ResourceDescriptor {
            name: self.name,
            noun: self.noun,
            fields: self.fields,
            option_label: self.option_label,
            list_columns,
        })
    }
}
