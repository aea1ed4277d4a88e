//! Built-in field kinds.

mod checkbox;
mod password_input;
mod text_input;

pub use checkbox::Checkbox;
pub use password_input::PasswordInput;
pub use text_input::TextInput;

use jobfill_protocols::{Answer, FieldError};

use crate::document::{DocumentTree, NodeId};

/// First `input` of the given `type` inside `element`.
pub(crate) fn find_input(tree: &DocumentTree, element: NodeId, input_type: &str) -> Option<NodeId> {
    tree.descendants(element).into_iter().find(|node| {
        tree.tag_name(*node)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("input"))
            && tree.attribute(*node, "type") == Some(input_type)
    })
}

pub(crate) fn require_input(
    tree: &DocumentTree,
    element: NodeId,
    field_type: &str,
    input_type: &str,
) -> Result<NodeId, FieldError> {
    find_input(tree, element, input_type).ok_or_else(|| {
        FieldError::Contract(format!(
            "{} container {} has no input[type={}]",
            field_type, element, input_type
        ))
    })
}

pub(crate) fn expect_string(field_type: &str, answer: &Answer) -> Result<String, FieldError> {
    answer
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| FieldError::AnswerType {
            field_type: field_type.to_string(),
            expected: "string",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{NodeSpec, Page};
    use crate::kind::FieldKind;
    use serde_json::json;

    fn field(input_type: &str, label: &str) -> NodeSpec {
        NodeSpec::new("div")
            .with_attr("data-automation-id", format!("formField-{}", label.to_lowercase()))
            .with_child(NodeSpec::new("label").with_text(label))
            .with_child(NodeSpec::new("input").with_attr("type", input_type))
    }

    fn container(page: &Page, kind: &dyn FieldKind) -> NodeId {
        page.read(|tree| tree.query(kind.locator(), tree.root()))[0]
    }

    #[test]
    fn test_locators_select_their_own_inputs() {
        let page = Page::from_specs(&[
            field("text", "Company"),
            field("password", "Password"),
            field("checkbox", "Agree"),
            NodeSpec::new("div")
                .with_attr("data-automation-id", "formField-country")
                .with_child(
                    NodeSpec::new("input")
                        .with_attr("type", "text")
                        .with_attr("aria-haspopup", "listbox"),
                ),
        ])
        .unwrap();

        let count = |kind: &dyn FieldKind| page.read(|tree| tree.query(kind.locator(), tree.root()).len());
        assert_eq!(count(&TextInput::new()), 1);
        assert_eq!(count(&PasswordInput::new()), 1);
        assert_eq!(count(&Checkbox::new()), 1);
    }

    #[test]
    fn test_text_input_fill_and_read() {
        let page = Page::from_specs(&[field("text", "Company")]).unwrap();
        let kind = TextInput::new();
        let el = container(&page, &kind);

        assert_eq!(page.read(|t| kind.current_value(t, el)), Some(json!("")));
        kind.fill(&page, el, &json!("Acme Corp")).unwrap();
        assert_eq!(page.read(|t| kind.current_value(t, el)), Some(json!("Acme Corp")));
        assert_eq!(page.read(|t| kind.listen_for_changes(t, el)).len(), 1);
    }

    #[test]
    fn test_text_input_rejects_non_string() {
        let kind = TextInput::new();
        let err = kind.answer(&json!(true)).unwrap_err();
        assert_eq!(err.to_string(), "TextInput expects a string answer");
        assert_eq!(kind.answer(&json!("x")).unwrap(), json!("x"));
    }

    #[test]
    fn test_text_input_section_from_ancestor() {
        let page = Page::from_specs(&[NodeSpec::new("section")
            .with_attr("data-section", "job2")
            .with_child(field("text", "Company"))])
        .unwrap();
        let plain = TextInput::new();
        let sectioned = TextInput::new().with_section_attribute("data-section");
        let el = container(&page, &plain);

        page.read(|tree| {
            assert_eq!(plain.section(tree, el), "");
            assert_eq!(sectioned.section(tree, el), "job2");
        });
    }

    #[test]
    fn test_password_input_is_sensitive() {
        let page = Page::from_specs(&[field("password", "Password")]).unwrap();
        let kind = PasswordInput::new();
        let el = container(&page, &kind);

        assert!(kind.is_sensitive());
        kind.fill(&page, el, &json!("hunter2")).unwrap();
        assert_eq!(page.read(|t| kind.current_value(t, el)), Some(json!("hunter2")));
    }

    #[test]
    fn test_checkbox_fill_and_read() {
        let page = Page::from_specs(&[field("checkbox", "Agree")]).unwrap();
        let kind = Checkbox::new();
        let el = container(&page, &kind);

        assert_eq!(page.read(|t| kind.current_value(t, el)), Some(json!(false)));
        kind.fill(&page, el, &json!(true)).unwrap();
        assert_eq!(page.read(|t| kind.current_value(t, el)), Some(json!(true)));
        assert!(matches!(
            kind.fill(&page, el, &json!("yes")),
            Err(FieldError::AnswerType { .. })
        ));
    }

    #[test]
    fn test_fill_without_control_is_contract_violation() {
        let page = Page::from_specs(&[NodeSpec::new("div")]).unwrap();
        let el = page.read(|t| t.find_first(t.root(), "div")).unwrap();
        let err = TextInput::new().fill(&page, el, &json!("x")).unwrap_err();
        assert!(matches!(err, FieldError::Contract(_)));
    }
}
