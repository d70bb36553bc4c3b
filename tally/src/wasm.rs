use crate::formula::{self, StaticResolver};
use crate::{Engine, GameState, TallyError};
use serde::Serialize;
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmEngine {
    engine: Engine,
}

impl Default for WasmEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WasmEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_error_panic_hook::set_once();

        WasmEngine {
            engine: Engine::new(),
        }
    }

    /// `bindings_json` is an object of reference name to number
    #[wasm_bindgen(js_name = evaluateFormula)]
    pub fn evaluate_formula(&self, formula_text: &str, bindings_json: &str) -> String {
        let resolver = match parse_bindings(bindings_json) {
            Ok(resolver) => resolver,
            Err(message) => return failure(&message),
        };
        match self.engine.evaluate_formula(formula_text, &resolver) {
            Ok(value) => success("value", &value),
            Err(e) => failure(&format_error(&e)),
        }
    }

    #[wasm_bindgen(js_name = validateFormula)]
    pub fn validate_formula(&self, formula_text: &str) -> String {
        to_json(&formula::validate(formula_text))
    }

    #[wasm_bindgen(js_name = extractReferences)]
    pub fn extract_references(&self, formula_text: &str) -> String {
        success("references", &formula::extract_references(formula_text))
    }

    #[wasm_bindgen(js_name = scoreboard)]
    pub fn scoreboard(&self, state_json: &str, session_id: &str, round_id: Option<String>) -> String {
        let state = match GameState::from_json(state_json) {
            Ok(state) => state,
            Err(e) => return failure(&format_error(&e)),
        };
        match self.engine.scoreboard(&state, session_id, round_id.as_deref()) {
            Ok(scoreboard) => success("scoreboard", &scoreboard),
            Err(e) => failure(&format_error(&e)),
        }
    }

    #[wasm_bindgen(js_name = runCycle)]
    pub fn run_cycle(&self, state_json: &str, session_id: &str) -> String {
        let state = match GameState::from_json(state_json) {
            Ok(state) => state,
            Err(e) => return failure(&format_error(&e)),
        };
        match self.engine.run_cycle(&state, session_id) {
            Ok(outcome) => success("cycle", &outcome),
            Err(e) => failure(&format_error(&e)),
        }
    }
}

fn parse_bindings(bindings_json: &str) -> Result<StaticResolver, String> {
    let mut resolver = StaticResolver::new();
    if bindings_json.trim().is_empty() {
        return Ok(resolver);
    }
    let value: Value = serde_json::from_str(bindings_json)
        .map_err(|e| format!("Invalid bindings JSON: {}", e))?;
    let Value::Object(map) = value else {
        return Err("Bindings must be a JSON object".to_string());
    };
    for (name, value) in map {
        let number = value
            .as_f64()
            .ok_or_else(|| format!("Binding '{}' must be a number", name))?;
        resolver.insert(&name, number);
    }
    Ok(resolver)
}

fn success<T: Serialize>(key: &str, payload: &T) -> String {
    let mut body = serde_json::Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    body.insert(
        key.to_string(),
        serde_json::to_value(payload).unwrap_or(Value::Null),
    );
    body.insert("error".to_string(), Value::Null);
    Value::Object(body).to_string()
}

fn failure(message: &str) -> String {
    json!({ "success": false, "error": message }).to_string()
}

fn to_json<T: Serialize>(payload: &T) -> String {
    serde_json::to_string(payload)
        .unwrap_or_else(|_| failure("Failed to serialize response"))
}

fn format_error(error: &TallyError) -> String {
    match error {
        TallyError::Syntax(details) => format!("Syntax Error: {}", details.message),
        TallyError::Runtime(details) => format!("Runtime Error: {}", details.message),
        TallyError::Engine(msg) => format!("Engine Error: {}", msg),
        TallyError::CircularDependency(msg) => format!("Circular Dependency: {}", msg),
        TallyError::ResourceLimitExceeded { .. } => error.to_string(),
        TallyError::MultipleErrors(errors) => {
            let error_messages: Vec<String> = errors.iter().map(format_error).collect();
            format!("Multiple Errors:\n{}", error_messages.join("\n"))
        }
    }
}
