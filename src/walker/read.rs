use std::rc::Rc;
use crate::{
    parse::{Node, Tag},
    util::ensure_sufficient_stack,
};
use super::{
    env::Envs,
    value::{ident, EvalError, Value},
};

/// Turn a parsed expression into an unlinked value tree.
///
/// Every lambda gets a fresh environment holding only its (unbound) parameter. Nothing is
/// linked to an enclosing scope yet.
pub fn read(node: &Node, envs: &mut Envs) -> Value {
    ensure_sufficient_stack(|| match (node.tag, node.children.as_slice()) {
        (Tag::Number, []) => node.text
            .parse()
            .map(Value::Number)
            .unwrap_or_else(|_| Value::Error(EvalError::InvalidNumber(node.text.clone()))),
        (Tag::Strings, []) => Value::String(node.text.clone()),
        (Tag::Identifier, []) => Value::symbol(&node.text),
        (Tag::Lambda, [param, body]) if param.tag == Tag::Identifier => {
            let param = ident(&param.text);
            let body = read(body, envs);
            let env = envs.new_env();
            env.insert_unbound(param);
            Value::Lambda {
                param,
                body: Rc::new(body),
                env,
            }
        },
        (Tag::Application, [left, right]) => Value::application(read(left, envs), read(right, envs)),
        _ => Value::Error(EvalError::MalformedExpression),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::lex, parse::parse, util::SrcRegion};
    use pretty_assertions::assert_eq;

    fn read_str(code: &str, envs: &mut Envs) -> Value {
        let nodes = parse(&lex(code).unwrap()).unwrap();
        read(&nodes[0], envs)
    }

    #[test]
    fn literals() {
        let mut envs = Envs::default();
        assert_eq!(read_str("-17", &mut envs), Value::Number(-17));
        assert_eq!(read_str("\"hi\"", &mut envs), Value::string("hi"));
        assert_eq!(read_str("foo", &mut envs), Value::symbol("foo"));
        assert_eq!(
            read_str("99999999999999999999", &mut envs),
            Value::Error(EvalError::InvalidNumber("99999999999999999999".into())),
        );
    }

    #[test]
    fn lambdas_get_an_unlinked_environment() {
        let mut envs = Envs::default();
        match &read_str("(\\x.x)", &mut envs) {
            Value::Lambda { param, body, env } => {
                assert_eq!(*param, ident("x"));
                assert_eq!(**body, Value::symbol("x"));
                assert_eq!(env.parent(), None);
                assert!(env.contains_local(ident("x")));
                assert_eq!(env.find(ident("x")), None);
            },
            other => panic!("expected a lambda, got {}", other),
        }
    }

    #[test]
    fn malformed_nodes() {
        let mut envs = Envs::default();
        let region = SrcRegion::none();
        let bad_param = Node::branch(
            Tag::Lambda,
            vec![Node::leaf(Tag::Number, "1", region), Node::leaf(Tag::Identifier, "x", region)],
            region,
        );
        assert_eq!(read(&bad_param, &mut envs), Value::Error(EvalError::MalformedExpression));

        let lopsided = Node::branch(Tag::Application, vec![Node::leaf(Tag::Identifier, "f", region)], region);
        assert_eq!(read(&lopsided, &mut envs), Value::Error(EvalError::MalformedExpression));

        let definition = read_str("def x = 1", &mut envs);
        assert_eq!(definition, Value::Error(EvalError::MalformedExpression));
    }

    #[test]
    fn rendering_reads_back() {
        let mut envs = Envs::default();
        for code in &[
            "42",
            "-3",
            "\"a \\\"quoted\\\" \\\\ string\"",
            "sym",
            "(\\x.x)",
            "{(\\x.(\\y.{x y})) (\\z.z)}",
        ] {
            let value = read_str(code, &mut envs);
            let rendered = value.to_string();
            assert_eq!(read_str(&rendered, &mut envs).to_string(), rendered);
        }
        assert_eq!(read_str("(f \"s\")", &mut envs).to_string(), "{f \"s\"}");
        assert_eq!(Value::Error(EvalError::NotApplicable).to_string(), "<ERR \"Not a lambda!\">");
    }
}
