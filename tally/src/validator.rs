use crate::analysis;
use crate::context::GameState;
use crate::formula;
use crate::model::{
    ActiveWindow, CategoryDefinition, DisplayType, ObjectDefinition, ObjectType, Ownership,
    Session, SetType, VariableValue,
};
use crate::TallyError;
use serde::Serialize;

/// Outcome of checking an object value against its definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValueValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// Check a value against the definition's type, bounds and set elements.
///
/// A null value means "unset" and is always accepted.
pub fn validate_object_value(def: &ObjectDefinition, value: &VariableValue) -> ValueValidation {
    if value.is_null() {
        return ValueValidation::ok();
    }

    match (def.object_type, value) {
        (ObjectType::Custom, _) => ValueValidation::ok(),
        (ObjectType::Number, VariableValue::Number(n)) => check_bounds(def, *n),
        (ObjectType::Boolean, VariableValue::Boolean(_)) => ValueValidation::ok(),
        (ObjectType::String, VariableValue::Text(_)) => ValueValidation::ok(),
        (ObjectType::Set, VariableValue::Number(count))
            if def.set_type != Some(SetType::Elements) =>
        {
            if *count < 0.0 || count.fract() != 0.0 {
                return ValueValidation::invalid(format!(
                    "{} must be a whole, non-negative count",
                    def.name
                ));
            }
            check_bounds(def, *count)
        }
        (ObjectType::Set, VariableValue::Elements(elements))
            if def.set_type != Some(SetType::Identical) =>
        {
            for (element, quantity) in elements {
                if !def.set_elements.is_empty() && !def.set_elements.iter().any(|e| &e.id == element) {
                    return ValueValidation::invalid(format!(
                        "'{}' is not an element of {}",
                        element, def.name
                    ));
                }
                if *quantity < 0.0 || quantity.fract() != 0.0 {
                    return ValueValidation::invalid(format!(
                        "Quantity of '{}' must be a whole, non-negative number",
                        element
                    ));
                }
            }
            check_bounds(def, elements.values().sum())
        }
        (expected, actual) => ValueValidation::invalid(format!(
            "{} expects a {} value, got {}",
            def.name,
            type_name(expected, def.set_type),
            actual.type_name()
        )),
    }
}

fn check_bounds(def: &ObjectDefinition, n: f64) -> ValueValidation {
    if !n.is_finite() {
        return ValueValidation::invalid(format!("{} must be a finite number", def.name));
    }
    if let Some(min) = def.min {
        if n < min {
            return ValueValidation::invalid(format!("{} must be at least {}", def.name, min));
        }
    }
    if let Some(max) = def.max {
        if n > max {
            return ValueValidation::invalid(format!("{} must be at most {}", def.name, max));
        }
    }
    ValueValidation::ok()
}

fn type_name(object_type: ObjectType, set_type: Option<SetType>) -> &'static str {
    match (object_type, set_type) {
        (ObjectType::Number, _) => "number",
        (ObjectType::Boolean, _) => "boolean",
        (ObjectType::String, _) => "string",
        (ObjectType::Set, Some(SetType::Identical)) => "count",
        (ObjectType::Set, Some(SetType::Elements)) => "element map",
        (ObjectType::Set, None) => "set",
        (ObjectType::Custom, _) => "custom",
    }
}

/// A problem found by the [`Validator`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub session_id: String,
    /// What the issue is attached to, e.g. `category 'Bonus'`
    pub location: String,
    pub message: String,
}

/// Static checks over a session's template, categories, rules and objects.
///
/// The engine tolerates every problem reported here at evaluation time
/// (broken formulas keep base totals, cycles are skipped), so these checks
/// exist to surface mistakes to the template author.
#[derive(Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Issues across every session in the snapshot
    pub fn check_state(&self, state: &GameState) -> Vec<Issue> {
        state
            .sessions
            .iter()
            .flat_map(|session| self.check_session(state, session))
            .collect()
    }

    pub fn check_session(&self, state: &GameState, session: &Session) -> Vec<Issue> {
        let mut report = Report {
            session_id: &session.id,
            issues: Vec::new(),
        };
        let categories: Vec<&CategoryDefinition> = state.categories_for(&session.id).collect();

        // Phase 1: category formulas and weights
        self.check_categories(&categories, &mut report);

        // Phase 2: the category forest
        self.check_category_forest(&categories, &mut report);

        // Phase 3: formula categories referring to each other in a loop
        if let Err(e) = analysis::formula_evaluation_order(&categories) {
            report.push("categories", describe(&e));
        }

        // Phase 4: object definitions and their values
        if let Some(template) = state.template_for(session) {
            self.check_object_definitions(&template.object_definitions, &mut report);
            for value in state.object_values_for(&session.id) {
                let location = format!("object value '{}'", value.id);
                match template
                    .object_definitions
                    .iter()
                    .find(|d| d.id == value.object_definition_id)
                {
                    Some(def) => {
                        let result = validate_object_value(def, &value.value);
                        if let Some(error) = result.error {
                            report.push(&location, error);
                        }
                    }
                    None => report.push(
                        &location,
                        format!("unknown object definition '{}'", value.object_definition_id),
                    ),
                }
            }
        } else if let Some(template_id) = &session.template_id {
            report.push("session", format!("template '{}' not found", template_id));
        }

        // Phase 5: rules
        self.check_rules(state, session, &categories, &mut report);

        report.issues
    }

    fn check_categories(&self, categories: &[&CategoryDefinition], report: &mut Report) {
        for category in categories {
            let location = format!("category '{}'", category.name);
            match category.display_type {
                DisplayType::Formula => match category.formula.as_deref() {
                    Some(text) => {
                        if let Some(error) = formula::validate(text).error {
                            report.push(&location, format!("invalid formula: {}", error));
                        }
                    }
                    None => report.push(&location, "formula category has no formula"),
                },
                DisplayType::Weighted => {
                    if category.weight.is_some_and(|w| !w.is_finite()) {
                        report.push(&location, "weight must be a finite number");
                    }
                }
                DisplayType::Sum => {}
            }
        }
    }

    fn check_category_forest(&self, categories: &[&CategoryDefinition], report: &mut Report) {
        for category in categories {
            if let Some(parent) = category.parent_category_id.as_deref() {
                if !categories.iter().any(|c| c.id == parent) {
                    report.push(
                        &format!("category '{}'", category.name),
                        format!("parent category '{}' not found", parent),
                    );
                }
            }
        }
        if let Some(cycle) = analysis::find_parent_cycle(categories) {
            report.push(
                "categories",
                format!("parent links form a cycle: {}", cycle.join(" -> ")),
            );
        }
    }

    fn check_object_definitions(&self, definitions: &[ObjectDefinition], report: &mut Report) {
        let exists = |id: &str| definitions.iter().any(|d| d.id == id);

        for def in definitions {
            let location = format!("object '{}'", def.name);
            for (label, text) in [
                ("calculation", def.calculation.as_deref()),
                ("score impact", def.score_impact.as_deref()),
            ] {
                if let Some(error) = text.and_then(|t| formula::validate(t).error) {
                    report.push(&location, format!("invalid {}: {}", label, error));
                }
            }

            if let Ownership::Object { object_id } = &def.ownership {
                if object_id == &def.id {
                    report.push(&location, "ownership refers to the object itself");
                } else if !exists(object_id.as_str()) {
                    report.push(&location, format!("ownership refers to unknown object '{}'", object_id));
                }
            }
            if let ActiveWindow::Object { object_id } = &def.active_window {
                if !exists(object_id.as_str()) {
                    report.push(
                        &location,
                        format!("active window refers to unknown object '{}'", object_id),
                    );
                }
            }

            if let (Some(min), Some(max)) = (def.min, def.max) {
                if min > max {
                    report.push(&location, format!("min {} is greater than max {}", min, max));
                }
            }
            if def.object_type == ObjectType::Set
                && def.set_type == Some(SetType::Elements)
                && def.set_elements.is_empty()
            {
                report.push(&location, "element set has no elements");
            }
            if let Some(error) = validate_object_value(def, &def.default_value).error {
                report.push(&location, format!("default value: {}", error));
            }
        }
    }

    fn check_rules(
        &self,
        state: &GameState,
        session: &Session,
        categories: &[&CategoryDefinition],
        report: &mut Report,
    ) {
        let template = state.template_for(session);
        let known_category = |reference: &str| {
            categories
                .iter()
                .any(|c| c.id == reference || c.name.eq_ignore_ascii_case(reference))
        };

        for rule in state.rules_for(&session.id) {
            let location = format!("rule '{}'", rule.name);
            if let Some(target) = rule.action.target_category_id.as_deref() {
                if !known_category(target) {
                    report.push(&location, format!("target category '{}' not found", target));
                }
            }
            if let (Some(template), Some(template_rule_id)) = (template, rule.template_rule_id.as_deref()) {
                if !template.rules.iter().any(|t| t.id == template_rule_id) {
                    report.push(
                        &location,
                        format!(
                            "template rule '{}' no longer exists; the rule will not fire",
                            template_rule_id
                        ),
                    );
                }
            }
        }
    }
}

struct Report<'s> {
    session_id: &'s str,
    issues: Vec<Issue>,
}

impl Report<'_> {
    fn push(&mut self, location: &str, message: impl Into<String>) {
        self.issues.push(Issue {
            session_id: self.session_id.to_string(),
            location: location.to_string(),
            message: message.into(),
        });
    }
}

fn describe(error: &TallyError) -> String {
    match error {
        TallyError::CircularDependency(msg) => msg.clone(),
        other => other.message(),
    }
}
