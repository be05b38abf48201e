//! remora-registry: the schema-driven API registry.
//!
//! The server self-reports its callable surface through one bootstrap
//! introspection call. This crate parses that catalogue into immutable
//! typed [`Signature`]s, merges the small statically-known set of
//! functions older servers omit from the catalogue, and provides the
//! argument validation and result decoding the facade runs a call
//! through. One generic check/decode path keyed by [`WireType`] replaces
//! any per-arity dispatch.

#![forbid(unsafe_code)]

use core::fmt;
use std::collections::HashMap;

use rmpv::Value;
use tracing::debug;

/// The three kinds of opaque server-side object references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Buffer,
    Window,
    Tabpage,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer => write!(f, "Buffer"),
            Self::Window => write!(f, "Window"),
            Self::Tabpage => write!(f, "Tabpage"),
        }
    }
}

/// Classified wire-level type of a parameter or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Integer,
    String,
    Boolean,
    /// An opaque dynamic value, passed through undecoded.
    Object,
    /// An opaque structured value (`Array`/`Dictionary`), passed through
    /// undecoded.
    RawValue,
    /// A 64-bit object reference; travels as a plain integer or a
    /// fixed-width ext payload.
    Handle(HandleKind),
    ArrayOfInteger,
    ArrayOfString,
    ArrayOfHandle,
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "Integer"),
            Self::String => write!(f, "String"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Object => write!(f, "Object"),
            Self::RawValue => write!(f, "RawValue"),
            Self::Handle(kind) => write!(f, "{kind}"),
            Self::ArrayOfInteger => write!(f, "ArrayOfInteger"),
            Self::ArrayOfString => write!(f, "ArrayOfString"),
            Self::ArrayOfHandle => write!(f, "ArrayOfHandle"),
        }
    }
}

/// Registry-build and call-validation failures.
///
/// All of these are raised before any bytes reach the wire.
#[derive(Debug)]
pub enum SchemaError {
    /// The method name is not in the registry.
    UnknownFunction(String),
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    ArgumentType {
        name: String,
        index: usize,
        expected: WireType,
        got: &'static str,
    },
    /// A type name in the catalogue matched no classification rule.
    UnknownWireType(String),
    /// The bootstrap result was not shaped like a catalogue.
    MalformedCatalogue(String),
    /// The result payload did not match the declared return type.
    ResultType {
        expected: WireType,
        got: &'static str,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFunction(name) => write!(f, "unknown function {name:?}"),
            Self::ArityMismatch { name, expected, got } => {
                write!(f, "{name} takes {expected} argument(s), got {got}")
            }
            Self::ArgumentType {
                name,
                index,
                expected,
                got,
            } => write!(
                f,
                "{name} argument {index} must be {expected}, got {got}"
            ),
            Self::UnknownWireType(name) => write!(f, "unknown wire type {name:?}"),
            Self::MalformedCatalogue(msg) => write!(f, "malformed catalogue: {msg}"),
            Self::ResultType { expected, got } => {
                write!(f, "result must be {expected}, got {got}")
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: WireType,
}

/// Immutable typed shape of one callable function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<Param>,
    /// `None` means the function returns no value (`void`).
    pub return_type: Option<WireType>,
    pub is_async: bool,
    pub can_fail: bool,
}

impl Signature {
    /// Validate caller-supplied arguments against the declared parameters.
    pub fn check_args(&self, args: &[Value]) -> Result<(), SchemaError> {
        if args.len() != self.params.len() {
            return Err(SchemaError::ArityMismatch {
                name: self.name.clone(),
                expected: self.params.len(),
                got: args.len(),
            });
        }
        for (index, (param, arg)) in self.params.iter().zip(args).enumerate() {
            if !matches_wire_type(param.ty, arg) {
                return Err(SchemaError::ArgumentType {
                    name: self.name.clone(),
                    index,
                    expected: param.ty,
                    got: kind(arg),
                });
            }
        }
        Ok(())
    }

    /// Human-readable rendering of the signature, for diagnostics.
    ///
    /// `fn vim_strwidth(str: String) -> Integer`
    pub fn describe(&self) -> String {
        use fmt::Write;
        let mut out = format!("fn {}(", self.name);
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}: {}", param.name, param.ty);
        }
        out.push(')');
        if let Some(ret) = self.return_type {
            let _ = write!(out, " -> {ret}");
        }
        out
    }

    /// Decode a raw result payload into the declared return shape.
    ///
    /// Integer- and handle-typed values are normalized from either wire
    /// encoding (plain integer or ext payload) to a plain integer,
    /// element-wise inside list returns. Opaque types pass through.
    pub fn decode_result(&self, result: Value) -> Result<Value, SchemaError> {
        let Some(ty) = self.return_type else {
            // void: servers answer with nil; whatever arrives is dropped.
            return Ok(Value::Nil);
        };
        decode_typed(ty, result)
    }
}

fn decode_typed(ty: WireType, value: Value) -> Result<Value, SchemaError> {
    let mismatch = |value: &Value| SchemaError::ResultType {
        expected: ty,
        got: kind(value),
    };
    match ty {
        WireType::Integer | WireType::Handle(_) => match int_from_value(&value) {
            Some(n) => Ok(Value::from(n)),
            None => Err(mismatch(&value)),
        },
        WireType::String => match value {
            Value::String(_) => Ok(value),
            other => Err(mismatch(&other)),
        },
        WireType::Boolean => match value {
            Value::Boolean(_) => Ok(value),
            other => Err(mismatch(&other)),
        },
        WireType::Object | WireType::RawValue => Ok(value),
        WireType::ArrayOfInteger | WireType::ArrayOfHandle => match value {
            Value::Array(items) => {
                let mut decoded = Vec::with_capacity(items.len());
                for item in items {
                    match int_from_value(&item) {
                        Some(n) => decoded.push(Value::from(n)),
                        None => return Err(mismatch(&item)),
                    }
                }
                Ok(Value::Array(decoded))
            }
            other => Err(mismatch(&other)),
        },
        WireType::ArrayOfString => match value {
            Value::Array(items) => {
                if let Some(bad) = items.iter().find(|v| !matches!(v, Value::String(_))) {
                    return Err(mismatch(bad));
                }
                Ok(Value::Array(items))
            }
            other => Err(mismatch(&other)),
        },
    }
}

/// Read an integer from either of its wire encodings.
///
/// Ext payloads are little-endian and at most 8 bytes; shorter payloads
/// are zero-extended on the most-significant side. Payloads longer than
/// 8 bytes are rejected.
pub fn int_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(_) => value.as_i64(),
        Value::Ext(_, data) if data.len() <= 8 => {
            let mut bytes = [0u8; 8];
            bytes[..data.len()].copy_from_slice(data);
            Some(i64::from_le_bytes(bytes))
        }
        _ => None,
    }
}

fn matches_wire_type(ty: WireType, value: &Value) -> bool {
    match ty {
        WireType::Integer | WireType::Handle(_) => int_from_value(value).is_some(),
        WireType::String => matches!(value, Value::String(_)),
        WireType::Boolean => matches!(value, Value::Boolean(_)),
        WireType::Object | WireType::RawValue => true,
        WireType::ArrayOfInteger | WireType::ArrayOfHandle => match value {
            Value::Array(items) => items.iter().all(|v| int_from_value(v).is_some()),
            _ => false,
        },
        WireType::ArrayOfString => match value {
            Value::Array(items) => items.iter().all(|v| matches!(v, Value::String(_))),
            _ => false,
        },
    }
}

/// Classify a catalogue type name appearing in parameter position.
pub fn classify(name: &str) -> Result<WireType, SchemaError> {
    match name {
        "Integer" => Ok(WireType::Integer),
        "String" => Ok(WireType::String),
        "Boolean" => Ok(WireType::Boolean),
        "Object" => Ok(WireType::Object),
        "Buffer" => Ok(WireType::Handle(HandleKind::Buffer)),
        "Window" => Ok(WireType::Handle(HandleKind::Window)),
        "Tabpage" => Ok(WireType::Handle(HandleKind::Tabpage)),
        "Array" | "Dictionary" => Ok(WireType::RawValue),
        other if other.starts_with("ArrayOf(Integer") => Ok(WireType::ArrayOfInteger),
        other if other.starts_with("ArrayOf(String") => Ok(WireType::ArrayOfString),
        other
            if other.starts_with("ArrayOf(Buffer")
                || other.starts_with("ArrayOf(Window")
                || other.starts_with("ArrayOf(Tabpage") =>
        {
            Ok(WireType::ArrayOfHandle)
        }
        other => Err(SchemaError::UnknownWireType(other.to_string())),
    }
}

/// Classify a catalogue type name in return position, where `void` is
/// additionally allowed and means "no return value".
pub fn classify_return(name: &str) -> Result<Option<WireType>, SchemaError> {
    if name == "void" {
        return Ok(None);
    }
    classify(name).map(Some)
}

/// The per-connection function table.
///
/// Built once from the bootstrap introspection result, immutable
/// thereafter.
#[derive(Debug)]
pub struct ApiRegistry {
    channel_id: u64,
    functions: HashMap<String, Signature>,
}

impl ApiRegistry {
    /// Build the registry from the result of the bootstrap call.
    ///
    /// The payload is `[channel_id, metadata]` where
    /// `metadata["functions"]` lists the function descriptors. After
    /// ingesting the catalogue, the statically-declared UI functions are
    /// merged for names the catalogue does not already define.
    pub fn from_api_info(result: &Value) -> Result<Self, SchemaError> {
        let Value::Array(parts) = result else {
            return Err(SchemaError::MalformedCatalogue(format!(
                "api info must be an array, got {}",
                kind(result)
            )));
        };
        let channel_id = parts
            .first()
            .and_then(int_from_value)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| {
                SchemaError::MalformedCatalogue("missing channel id".to_string())
            })?;
        let metadata = parts.get(1).ok_or_else(|| {
            SchemaError::MalformedCatalogue("missing metadata map".to_string())
        })?;
        let descriptors = map_get(metadata, "functions")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                SchemaError::MalformedCatalogue(
                    "metadata has no function list".to_string(),
                )
            })?;

        let mut functions = HashMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let sig = parse_descriptor(descriptor)?;
            functions.insert(sig.name.clone(), sig);
        }

        // Some server versions leave these out of the catalogue. The
        // catalogue wins whenever it does define the name.
        for sig in static_extensions() {
            functions.entry(sig.name.clone()).or_insert(sig);
        }

        debug!(channel_id, count = functions.len(), "registry built");
        Ok(Self {
            channel_id,
            functions,
        })
    }

    /// The channel id the server assigned this connection.
    pub fn channel_id(&self) -> u64 {
        self.channel_id
    }

    pub fn lookup(&self, name: &str) -> Option<&Signature> {
        self.functions.get(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn parse_descriptor(descriptor: &Value) -> Result<Signature, SchemaError> {
    let name = map_get(descriptor, "name")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            SchemaError::MalformedCatalogue("function descriptor has no name".to_string())
        })?
        .to_string();

    let raw_params = map_get(descriptor, "parameters")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            SchemaError::MalformedCatalogue(format!("{name}: missing parameter list"))
        })?;
    let mut params = Vec::with_capacity(raw_params.len());
    for pair in raw_params {
        // Each parameter is a two-element [type, name] array.
        let (ty_name, param_name) = match pair.as_array().map(Vec::as_slice) {
            Some([ty, pname]) => (
                ty.as_str().ok_or_else(|| {
                    SchemaError::MalformedCatalogue(format!(
                        "{name}: parameter type is not a string"
                    ))
                })?,
                pname.as_str().unwrap_or(""),
            ),
            _ => {
                return Err(SchemaError::MalformedCatalogue(format!(
                    "{name}: parameter is not a [type, name] pair"
                )))
            }
        };
        params.push(Param {
            name: param_name.to_string(),
            ty: classify(ty_name)?,
        });
    }

    let return_type = map_get(descriptor, "return_type")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            SchemaError::MalformedCatalogue(format!("{name}: missing return type"))
        })
        .and_then(classify_return)?;

    let is_async = map_get(descriptor, "async")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let can_fail = map_get(descriptor, "can_fail")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(Signature {
        name,
        params,
        return_type,
        is_async,
        can_fail,
    })
}

/// Functions the bootstrap catalogue omits on some server versions.
fn static_extensions() -> Vec<Signature> {
    let int_param = |name: &str| Param {
        name: name.to_string(),
        ty: WireType::Integer,
    };
    vec![
        Signature {
            name: "ui_attach".to_string(),
            params: vec![
                int_param("width"),
                int_param("height"),
                Param {
                    name: "rgb".to_string(),
                    ty: WireType::Boolean,
                },
            ],
            return_type: None,
            is_async: false,
            can_fail: false,
        },
        Signature {
            name: "ui_detach".to_string(),
            params: vec![],
            return_type: None,
            is_async: false,
            can_fail: false,
        },
        Signature {
            name: "ui_try_resize".to_string(),
            params: vec![int_param("width"), int_param("height")],
            return_type: None,
            is_async: false,
            can_fail: false,
        },
    ]
}

fn map_get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let Value::Map(entries) = value else {
        return None;
    };
    entries
        .iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Nil => "nil",
        Value::Boolean(_) => "boolean",
        Value::Integer(_) => "integer",
        Value::F32(_) | Value::F64(_) => "float",
        Value::String(_) => "string",
        Value::Binary(_) => "binary",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Ext(..) => "ext",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, params: &[(&str, &str)], ret: &str) -> Value {
        let params: Vec<Value> = params
            .iter()
            .map(|(ty, pname)| Value::Array(vec![Value::from(*ty), Value::from(*pname)]))
            .collect();
        Value::Map(vec![
            (Value::from("name"), Value::from(name)),
            (Value::from("parameters"), Value::Array(params)),
            (Value::from("return_type"), Value::from(ret)),
        ])
    }

    fn api_info(functions: Vec<Value>) -> Value {
        Value::Array(vec![
            Value::from(1),
            Value::Map(vec![(Value::from("functions"), Value::Array(functions))]),
        ])
    }

    #[test]
    fn classification_rules() {
        assert_eq!(classify("Integer").unwrap(), WireType::Integer);
        assert_eq!(classify("String").unwrap(), WireType::String);
        assert_eq!(classify("Boolean").unwrap(), WireType::Boolean);
        assert_eq!(classify("Object").unwrap(), WireType::Object);
        assert_eq!(classify("Array").unwrap(), WireType::RawValue);
        assert_eq!(classify("Dictionary").unwrap(), WireType::RawValue);
        assert_eq!(
            classify("Buffer").unwrap(),
            WireType::Handle(HandleKind::Buffer)
        );
        assert_eq!(
            classify("Window").unwrap(),
            WireType::Handle(HandleKind::Window)
        );
        assert_eq!(
            classify("Tabpage").unwrap(),
            WireType::Handle(HandleKind::Tabpage)
        );
        assert_eq!(
            classify("ArrayOf(Integer)").unwrap(),
            WireType::ArrayOfInteger
        );
        assert_eq!(
            classify("ArrayOf(Integer, 2)").unwrap(),
            WireType::ArrayOfInteger
        );
        assert_eq!(classify("ArrayOf(String)").unwrap(), WireType::ArrayOfString);
        assert_eq!(classify("ArrayOf(Buffer)").unwrap(), WireType::ArrayOfHandle);
        assert_eq!(classify("ArrayOf(Window)").unwrap(), WireType::ArrayOfHandle);
        assert_eq!(
            classify("ArrayOf(Tabpage)").unwrap(),
            WireType::ArrayOfHandle
        );
        assert!(matches!(
            classify("Float"),
            Err(SchemaError::UnknownWireType(_))
        ));
        assert_eq!(classify_return("void").unwrap(), None);
        assert_eq!(
            classify_return("Integer").unwrap(),
            Some(WireType::Integer)
        );
    }

    #[test]
    fn builds_registry_from_catalogue() {
        let info = api_info(vec![
            descriptor("vim_strwidth", &[("String", "str")], "Integer"),
            descriptor("vim_get_current_buffer", &[], "Buffer"),
        ]);
        let registry = ApiRegistry::from_api_info(&info).unwrap();
        assert_eq!(registry.channel_id(), 1);

        let sig = registry.lookup("vim_strwidth").unwrap();
        assert_eq!(sig.params.len(), 1);
        assert_eq!(sig.params[0].ty, WireType::String);
        assert_eq!(sig.return_type, Some(WireType::Integer));
        assert!(!sig.is_async);
        assert!(!sig.can_fail);

        let sig = registry.lookup("vim_get_current_buffer").unwrap();
        assert_eq!(sig.return_type, Some(WireType::Handle(HandleKind::Buffer)));
    }

    #[test]
    fn async_and_can_fail_flags_default_false_and_parse() {
        let mut desc = descriptor("vim_eval", &[("String", "expr")], "Object");
        if let Value::Map(entries) = &mut desc {
            entries.push((Value::from("async"), Value::from(true)));
            entries.push((Value::from("can_fail"), Value::from(true)));
        }
        let registry = ApiRegistry::from_api_info(&api_info(vec![desc])).unwrap();
        let sig = registry.lookup("vim_eval").unwrap();
        assert!(sig.is_async);
        assert!(sig.can_fail);
    }

    #[test]
    fn static_extensions_fill_gaps_but_never_override() {
        // An empty catalogue still gets the UI family.
        let registry = ApiRegistry::from_api_info(&api_info(vec![])).unwrap();
        let attach = registry.lookup("ui_attach").unwrap();
        assert_eq!(attach.params.len(), 3);
        assert_eq!(attach.return_type, None);
        assert!(registry.lookup("ui_detach").unwrap().params.is_empty());
        assert_eq!(registry.lookup("ui_try_resize").unwrap().params.len(), 2);

        // A catalogue that defines the name wins.
        let info = api_info(vec![descriptor(
            "ui_attach",
            &[("Integer", "width"), ("Integer", "height")],
            "Boolean",
        )]);
        let registry = ApiRegistry::from_api_info(&info).unwrap();
        let attach = registry.lookup("ui_attach").unwrap();
        assert_eq!(attach.params.len(), 2);
        assert_eq!(attach.return_type, Some(WireType::Boolean));
    }

    #[test]
    fn unknown_wire_type_fails_the_build() {
        let info = api_info(vec![descriptor("bad", &[("Float", "x")], "void")]);
        assert!(matches!(
            ApiRegistry::from_api_info(&info),
            Err(SchemaError::UnknownWireType(t)) if t == "Float"
        ));
    }

    #[test]
    fn malformed_catalogue_is_rejected() {
        assert!(matches!(
            ApiRegistry::from_api_info(&Value::from("nope")),
            Err(SchemaError::MalformedCatalogue(_))
        ));
        assert!(matches!(
            ApiRegistry::from_api_info(&Value::Array(vec![Value::from(1)])),
            Err(SchemaError::MalformedCatalogue(_))
        ));
    }

    #[test]
    fn arity_and_argument_type_checks() {
        let sig = Signature {
            name: "vim_set_current_line".to_string(),
            params: vec![Param {
                name: "line".to_string(),
                ty: WireType::String,
            }],
            return_type: None,
            is_async: false,
            can_fail: true,
        };
        assert!(sig.check_args(&[Value::from("hello")]).is_ok());
        assert!(matches!(
            sig.check_args(&[]),
            Err(SchemaError::ArityMismatch { expected: 1, got: 0, .. })
        ));
        assert!(matches!(
            sig.check_args(&[Value::from(5)]),
            Err(SchemaError::ArgumentType { index: 0, .. })
        ));
    }

    #[test]
    fn handle_arguments_accept_both_encodings() {
        let sig = Signature {
            name: "buffer_line_count".to_string(),
            params: vec![Param {
                name: "buffer".to_string(),
                ty: WireType::Handle(HandleKind::Buffer),
            }],
            return_type: Some(WireType::Integer),
            is_async: false,
            can_fail: false,
        };
        assert!(sig.check_args(&[Value::from(2)]).is_ok());
        assert!(sig.check_args(&[Value::Ext(0, vec![2])]).is_ok());
        assert!(sig.check_args(&[Value::from("2")]).is_err());
    }

    #[test]
    fn ext_and_plain_integer_decode_identically() {
        for v in [0i64, 1, 0x2a, 300, 70_000, i32::MAX as i64 + 1] {
            let mut bytes = v.to_le_bytes().to_vec();
            while bytes.len() > 1 && bytes.last() == Some(&0) {
                bytes.pop();
            }
            assert_eq!(int_from_value(&Value::Ext(0, bytes)), Some(v));
            assert_eq!(int_from_value(&Value::from(v)), Some(v));
        }
        // Full-width payload.
        assert_eq!(
            int_from_value(&Value::Ext(1, (-1i64).to_le_bytes().to_vec())),
            Some(-1)
        );
        // Oversized payloads are rejected.
        assert_eq!(int_from_value(&Value::Ext(0, vec![0; 9])), None);
    }

    #[test]
    fn decode_result_normalizes_handles_elementwise() {
        let sig = Signature {
            name: "vim_get_buffers".to_string(),
            params: vec![],
            return_type: Some(WireType::ArrayOfHandle),
            is_async: false,
            can_fail: false,
        };
        let raw = Value::Array(vec![
            Value::Ext(0, vec![1]),
            Value::from(2),
            Value::Ext(0, vec![3, 1]),
        ]);
        assert_eq!(
            sig.decode_result(raw).unwrap(),
            Value::Array(vec![Value::from(1), Value::from(2), Value::from(259)])
        );
    }

    #[test]
    fn decode_result_void_and_mismatch() {
        let void_sig = Signature {
            name: "ui_detach".to_string(),
            params: vec![],
            return_type: None,
            is_async: false,
            can_fail: false,
        };
        assert_eq!(void_sig.decode_result(Value::Nil).unwrap(), Value::Nil);

        let int_sig = Signature {
            name: "vim_strwidth".to_string(),
            params: vec![],
            return_type: Some(WireType::Integer),
            is_async: false,
            can_fail: false,
        };
        assert_eq!(
            int_sig.decode_result(Value::Ext(0, vec![3])).unwrap(),
            Value::from(3)
        );
        assert!(matches!(
            int_sig.decode_result(Value::from("3")),
            Err(SchemaError::ResultType { .. })
        ));
    }

    #[test]
    fn describe_renders_signatures() {
        let info = api_info(vec![
            descriptor("vim_strwidth", &[("String", "str")], "Integer"),
            descriptor("vim_del_current_line", &[], "void"),
        ]);
        let registry = ApiRegistry::from_api_info(&info).unwrap();
        assert_eq!(
            registry.lookup("vim_strwidth").unwrap().describe(),
            "fn vim_strwidth(str: String) -> Integer"
        );
        assert_eq!(
            registry.lookup("vim_del_current_line").unwrap().describe(),
            "fn vim_del_current_line()"
        );
        assert_eq!(
            registry.lookup("ui_attach").unwrap().describe(),
            "fn ui_attach(width: Integer, height: Integer, rgb: Boolean)"
        );
    }

    #[test]
    fn names_are_sorted() {
        let info = api_info(vec![
            descriptor("z_fn", &[], "void"),
            descriptor("a_fn", &[], "void"),
        ]);
        let registry = ApiRegistry::from_api_info(&info).unwrap();
        let names = registry.names();
        assert_eq!(names.first(), Some(&"a_fn"));
        assert!(names.contains(&"ui_attach"));
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
    }
}
