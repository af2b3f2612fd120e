//! Header/footer wrapping of the combined buffer.

use crate::core::AssetGroup;

use super::PostProcess;

/// Wraps the bundle in the group's configured header and footer.
///
/// `{name}` in either part is replaced with the group name, so a module
/// wrapper like `define("{name}", function () {` can be shared across groups.
/// Groups without a wrap pass through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModuleWrapper;

impl PostProcess for ModuleWrapper {
    fn name(&self) -> &str {
        "wrap"
    }

    fn process(&self, group: &AssetGroup, content: Vec<u8>) -> anyhow::Result<Vec<u8>> {
        let Some(wrap) = &group.options.wrap else {
            return Ok(content);
        };

        let header = wrap.header.replace("{name}", &group.name);
        let footer = wrap.footer.replace("{name}", &group.name);
        let mut out = Vec::with_capacity(header.len() + content.len() + footer.len() + 2);
        out.extend_from_slice(header.as_bytes());
        if !header.is_empty() {
            out.push(b'\n');
        }
        out.extend(content);
        if !footer.is_empty() {
            out.push(b'\n');
        }
        out.extend_from_slice(footer.as_bytes());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GroupOptions, Namespace, Wrap};

    #[test]
    fn test_wraps_with_group_name() {
        let group = AssetGroup::new(Namespace::Js, "app", "out.js").with_options(GroupOptions {
            append_hash: false,
            wrap: Some(Wrap {
                header: "define(\"{name}\", function () {".into(),
                footer: "});".into(),
            }),
        });
        let out = ModuleWrapper.process(&group, b"x();".to_vec()).unwrap();
        assert_eq!(out, b"define(\"app\", function () {\nx();\n});");
    }

    #[test]
    fn test_without_wrap_passes_through() {
        let group = AssetGroup::new(Namespace::Js, "app", "out.js");
        assert_eq!(ModuleWrapper.process(&group, b"x".to_vec()).unwrap(), b"x");
    }
}
