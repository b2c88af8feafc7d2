//! Draw options: a JSON-backed bag of geometry and styling attributes.
//!
//! User options are deep-merged over the defaults (merge, not replace), and attribute
//! lookup walks flow-state > per-kind > root default, first found wins.

use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions(Value);

impl Default for ChartOptions {
    fn default() -> Self {
        Self(default_options())
    }
}

impl ChartOptions {
    /// Defaults with `user` deep-merged on top.
    pub fn merged(user: &Value) -> Self {
        let mut options = Self::default();
        options.deep_merge(user);
        options
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn deep_merge(&mut self, other: &Value) {
        deep_merge_value(&mut self.0, other);
    }

    pub fn set_value(&mut self, dotted_path: &str, value: Value) {
        if !self.0.is_object() {
            self.0 = Value::Object(Map::new());
        }
        let Value::Object(ref mut root) = self.0 else {
            return;
        };
        let mut cur: &mut Map<String, Value> = root;
        let mut segments = dotted_path.split('.').peekable();
        while let Some(seg) = segments.next() {
            if segments.peek().is_none() {
                cur.insert(seg.to_string(), value);
                return;
            }
            let slot = cur.entry(seg).or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Some(next) = slot.as_object_mut() else {
                return;
            };
            cur = next;
        }
    }

    /// Resolves an attribute for a symbol context: the flow-state bucket wins over the
    /// per-kind bucket, which wins over the root default.
    pub fn attr_value(
        &self,
        name: &str,
        kind: Option<&str>,
        flow_state: Option<&str>,
    ) -> Option<&Value> {
        if let Some(state) = flow_state {
            if let Some(v) = self
                .0
                .get("flowstate")
                .and_then(|f| f.get(state))
                .and_then(|s| s.get(name))
            {
                return Some(v);
            }
        }
        if let Some(kind) = kind {
            if let Some(v) = self
                .0
                .get("symbols")
                .and_then(|s| s.get(kind))
                .and_then(|k| k.get(name))
            {
                return Some(v);
            }
        }
        self.0.get(name)
    }

    pub fn attr_f64(&self, name: &str, kind: Option<&str>, flow_state: Option<&str>) -> Option<f64> {
        self.attr_value(name, kind, flow_state).and_then(json_f64)
    }

    pub fn attr_str(
        &self,
        name: &str,
        kind: Option<&str>,
        flow_state: Option<&str>,
    ) -> Option<&str> {
        self.attr_value(name, kind, flow_state).and_then(Value::as_str)
    }

    /// Root-level numeric attribute (no symbol context).
    pub fn f64(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(json_f64)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }
}

fn json_f64(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_i64().map(|n| n as f64))
        .or_else(|| v.as_u64().map(|n| n as f64))
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}

fn default_options() -> Value {
    json!({
        "x": 0.0,
        "y": 0.0,
        "text-margin": 10.0,
        "font-size": 14.0,
        "font-color": "black",
        "line-width": 3.0,
        "line-length": 50.0,
        "line-color": "black",
        "element-color": "black",
        "fill": "white",
        "yes-text": "yes",
        "no-text": "no",
        "arrow-end": "block",
        "class": "flowchart",
        "scale": 1.0,
        "symbols": {
            "start": {},
            "end": {},
            "condition": {},
            "inputoutput": {},
            "operation": {},
            "subroutine": {},
            "parallel": {}
        }
    })
}
