//! # Call Statement Synthesis
//!
//! Builds the SQL text and positional parameters for one method call.
//! Identifiers come from the catalog and are always quoted; argument
//! values are only ever bound as parameters.

use super::errors::{FunctionError, FunctionResult};
use super::method::Method;
use crate::observability::Logger;
use crate::value::{Args, Value};

/// How the statement must be run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// No declared result: run through `execute`, report affected rows
    NoResult,
    /// Rows to shape: run through `query`
    Rows,
}

/// SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CallStatement {
    pub shape: CallShape,
    pub sql: String,
    pub params: Vec<Value>,
}

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `"class"."function"`
pub fn qualified_name(method: &Method) -> String {
    format!("{}.{}", quote_ident(&method.class), quote_ident(&method.function))
}

/// Bind caller arguments against the declared inputs
///
/// Returns the named-argument assignments and the parameters in
/// placeholder order. Absent and null arguments are the same thing: a
/// required one fails, an optional one is left out entirely.
pub fn bind_arguments(
    method: &Method,
    args: &Args,
    arg_syntax: &str,
) -> FunctionResult<(Vec<String>, Vec<Value>)> {
    let mut assignments = Vec::new();
    let mut params = Vec::new();

    for (key, input) in &method.inputs {
        let value = match args.get(key) {
            Some(value) if !value.is_null() => value,
            _ => {
                if input.required {
                    return Err(FunctionError::MissingRequiredArgument(key.clone()));
                }
                Logger::debug("RPC_ARG_SKIPPED", &[("arg", key.as_str())]);
                continue;
            }
        };

        params.push(value.clone());
        assignments.push(format!(
            "{} {} ${}",
            quote_ident(&input.db_name),
            arg_syntax,
            params.len()
        ));
        Logger::debug(
            "RPC_ARG_BOUND",
            &[("arg", key.as_str()), ("type", input.type_name.as_str())],
        );
    }

    Ok((assignments, params))
}

/// Build the complete call statement for `method`
pub fn build_call(method: &Method, args: &Args, arg_syntax: &str) -> FunctionResult<CallStatement> {
    let (assignments, params) = bind_arguments(method, args, arg_syntax)?;
    let call = format!("{}({})", qualified_name(method), assignments.join(", "));

    if method.is_no_result() {
        return Ok(CallStatement {
            shape: CallShape::NoResult,
            sql: format!("SELECT {}", call),
            params,
        });
    }

    let sql = if method.outputs.is_empty() {
        format!("SELECT {}", call)
    } else {
        let columns: Vec<String> = method.outputs.iter().map(|o| quote_ident(&o.name)).collect();
        format!("SELECT {} FROM {}", columns.join(", "), call)
    };

    Ok(CallStatement {
        shape: CallShape::Rows,
        sql,
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::method::{InputArg, OutputArg};

    fn args(pairs: &[(&str, Value)]) -> Args {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn user_lookup() -> Method {
        Method::new("get_user", "rpc", "get_user")
            .returning("record")
            .with_input(InputArg::new("a_id", "integer", true, "a_"))
            .with_input(InputArg::new("a_lang", "text", false, "a_"))
            .with_output(OutputArg::new("id", "integer"))
            .with_output(OutputArg::new("name", "text"))
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_struct_call() {
        let stmt = build_call(&user_lookup(), &args(&[("id", Value::Int(7))]), ":=").unwrap();
        assert_eq!(stmt.shape, CallShape::Rows);
        assert_eq!(
            stmt.sql,
            r#"SELECT "id", "name" FROM "rpc"."get_user"("a_id" := $1)"#
        );
        assert_eq!(stmt.params, vec![Value::Int(7)]);
    }

    #[test]
    fn test_scalar_call_has_no_from_clause() {
        let method = Method::new("now", "rpc", "now").returning("timestamptz");
        let stmt = build_call(&method, &Args::new(), ":=").unwrap();
        assert_eq!(stmt.sql, r#"SELECT "rpc"."now"()"#);
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_no_result_call() {
        let method = Method::new("delete_user", "rpc", "delete_user")
            .with_input(InputArg::new("a_id", "integer", true, "a_"));
        let stmt = build_call(&method, &args(&[("id", Value::Int(3))]), "=>").unwrap();
        assert_eq!(stmt.shape, CallShape::NoResult);
        assert_eq!(stmt.sql, r#"SELECT "rpc"."delete_user"("a_id" => $1)"#);
    }

    #[test]
    fn test_optional_argument_omitted() {
        let stmt = build_call(&user_lookup(), &args(&[("id", Value::Int(7))]), ":=").unwrap();
        assert!(!stmt.sql.contains("a_lang"));
        assert_eq!(stmt.params.len(), 1);
    }

    #[test]
    fn test_optional_null_argument_omitted() {
        let stmt = build_call(
            &user_lookup(),
            &args(&[("id", Value::Int(7)), ("lang", Value::Null)]),
            ":=",
        )
        .unwrap();
        assert!(!stmt.sql.contains("a_lang"));
        assert_eq!(stmt.params.len(), 1);
    }

    #[test]
    fn test_placeholders_are_consecutive() {
        let stmt = build_call(
            &user_lookup(),
            &args(&[("id", Value::Int(7)), ("lang", Value::from("en"))]),
            ":=",
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            r#"SELECT "id", "name" FROM "rpc"."get_user"("a_id" := $1, "a_lang" := $2)"#
        );
        assert_eq!(stmt.params, vec![Value::Int(7), Value::from("en")]);
    }

    #[test]
    fn test_required_missing_or_null() {
        let err = build_call(&user_lookup(), &Args::new(), ":=").unwrap_err();
        assert!(matches!(err, FunctionError::MissingRequiredArgument(ref k) if k == "id"));

        let err = build_call(&user_lookup(), &args(&[("id", Value::Null)]), ":=").unwrap_err();
        assert!(matches!(err, FunctionError::MissingRequiredArgument(_)));
    }

    #[test]
    fn test_unknown_caller_keys_are_ignored() {
        let stmt = build_call(
            &user_lookup(),
            &args(&[("id", Value::Int(1)), ("extra", Value::Int(2))]),
            ":=",
        )
        .unwrap();
        assert_eq!(stmt.params.len(), 1);
    }
}
