use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{QualifiedName, html};

/// One entry of the rewrite catalog, with its arguments.
///
/// Parses from and prints as an invocation such as `transformTable(true)`
/// or `markupHeading(H1)`; serde uses that string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Rewrite {
    TransformTable {
        single_row: bool,
    },
    MarkupHeading {
        element: QualifiedName,
    },
    MarkupHeadingInHeader {
        index: usize,
        heading: QualifiedName,
        header: QualifiedName,
    },
    RemoveImage,
    ConvertToList {
        ordered: bool,
    },
    ConvertToPoem,
    TransformNavList,
    WrapList {
        pre_content: usize,
        wrapper: QualifiedName,
    },
    WrapListInPrevious,
    WrapInFigure {
        caption_blocks: usize,
        caption_before: bool,
    },
    RemoveHiddenBox,
    MarkupPageBreak,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid invocation {invocation:?}: {reason}")]
pub struct InvalidInvocation {
    invocation: String,
    reason: String,
}

impl Rewrite {
    pub fn name(&self) -> &'static str {
        match self {
            Rewrite::TransformTable { .. } => "transformTable",
            Rewrite::MarkupHeading { .. } => "markupHeading",
            Rewrite::MarkupHeadingInHeader { .. } => "markupHeadingInHeader",
            Rewrite::RemoveImage => "removeImage",
            Rewrite::ConvertToList { .. } => "convertToList",
            Rewrite::ConvertToPoem => "convertToPoem",
            Rewrite::TransformNavList => "transformNavList",
            Rewrite::WrapList { .. } => "wrapList",
            Rewrite::WrapListInPrevious => "wrapListInPrevious",
            Rewrite::WrapInFigure { .. } => "wrapInFigure",
            Rewrite::RemoveHiddenBox => "removeHiddenBox",
            Rewrite::MarkupPageBreak => "markupPageBreak",
        }
    }
}

fn invocation_regex() -> &'static Regex {
    static INVOCATION: OnceLock<Regex> = OnceLock::new();
    INVOCATION.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z]+)\s*\((.*)\)\s*$").expect("Invalid invocation regex")
    })
}

/// Element arguments print as their constant (`H1`, `DIV`) when they have
/// one, otherwise in Clark notation: `{namespace}local` or
/// `{namespace}prefix:local`, with an empty namespace for none.
fn element_argument(name: &QualifiedName) -> String {
    let constant = name.local_part().to_ascii_uppercase();
    if html::by_constant(&constant).as_ref() == Some(name) {
        return constant;
    }
    let namespace = name.namespace().unwrap_or_default();
    match name.prefix() {
        Some(prefix) => format!("{{{namespace}}}{prefix}:{}", name.local_part()),
        None => format!("{{{namespace}}}{}", name.local_part()),
    }
}

fn parse_element_argument(arg: &str) -> Option<QualifiedName> {
    let Some(rest) = arg.strip_prefix('{') else {
        return html::by_constant(arg);
    };
    let (namespace, qualified) = rest.split_once('}')?;
    let (prefix, local) = match qualified.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qualified),
    };
    (!local.is_empty()).then(|| QualifiedName::new(Some(namespace), prefix, local))
}

/// Splits on commas outside `{...}`; empty arguments are dropped.
fn split_arguments(raw: &str) -> Vec<&str> {
    let mut values = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in raw.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                values.push(raw[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    values.push(raw[start..].trim());
    values.retain(|a| !a.is_empty());
    values
}

impl fmt::Display for Rewrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = match self {
            Rewrite::TransformTable { single_row } => single_row.to_string(),
            Rewrite::MarkupHeading { element } => element_argument(element),
            Rewrite::MarkupHeadingInHeader {
                index,
                heading,
                header,
            } => format!(
                "{index}, {}, {}",
                element_argument(heading),
                element_argument(header)
            ),
            Rewrite::ConvertToList { ordered } => ordered.to_string(),
            Rewrite::WrapList {
                pre_content,
                wrapper,
            } => format!("{pre_content}, {}", element_argument(wrapper)),
            Rewrite::WrapInFigure {
                caption_blocks,
                caption_before,
            } => format!("{caption_blocks}, {caption_before}"),
            Rewrite::RemoveImage
            | Rewrite::ConvertToPoem
            | Rewrite::TransformNavList
            | Rewrite::WrapListInPrevious
            | Rewrite::RemoveHiddenBox
            | Rewrite::MarkupPageBreak => String::new(),
        };
        write!(f, "{}({args})", self.name())
    }
}

struct Args<'a> {
    invocation: &'a str,
    values: Vec<&'a str>,
}

impl Args<'_> {
    fn error(&self, reason: impl Into<String>) -> InvalidInvocation {
        InvalidInvocation {
            invocation: self.invocation.to_string(),
            reason: reason.into(),
        }
    }

    fn expect_count(&self, count: usize) -> Result<(), InvalidInvocation> {
        if self.values.len() == count {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {count} argument(s), got {}",
                self.values.len()
            )))
        }
    }

    fn boolean(&self, i: usize) -> Result<bool, InvalidInvocation> {
        self.values[i]
            .parse()
            .map_err(|_| self.error(format!("argument {} is not a boolean", i + 1)))
    }

    fn number(&self, i: usize) -> Result<usize, InvalidInvocation> {
        self.values[i]
            .parse()
            .map_err(|_| self.error(format!("argument {} is not a count", i + 1)))
    }

    fn element(&self, i: usize) -> Result<QualifiedName, InvalidInvocation> {
        parse_element_argument(self.values[i])
            .ok_or_else(|| self.error(format!("unknown element {:?}", self.values[i])))
    }
}

impl FromStr for Rewrite {
    type Err = InvalidInvocation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = invocation_regex().captures(s).ok_or_else(|| InvalidInvocation {
            invocation: s.to_string(),
            reason: "expected name(arguments)".to_string(),
        })?;
        let (_, [name, raw_args]) = captures.extract();
        let args = Args {
            invocation: s,
            values: split_arguments(raw_args),
        };

        let rewrite = match name {
            "transformTable" => {
                args.expect_count(1)?;
                Rewrite::TransformTable {
                    single_row: args.boolean(0)?,
                }
            }
            "markupHeading" => {
                args.expect_count(1)?;
                let element = args.element(0)?;
                if !html::is_heading(&element) {
                    return Err(args.error("markupHeading takes a heading element"));
                }
                Rewrite::MarkupHeading { element }
            }
            "markupHeadingInHeader" => {
                args.expect_count(3)?;
                let heading = args.element(1)?;
                if !html::is_heading(&heading) {
                    return Err(args.error("markupHeadingInHeader takes a heading element"));
                }
                Rewrite::MarkupHeadingInHeader {
                    index: args.number(0)?,
                    heading,
                    header: args.element(2)?,
                }
            }
            "removeImage" => {
                args.expect_count(0)?;
                Rewrite::RemoveImage
            }
            "convertToList" => {
                args.expect_count(1)?;
                Rewrite::ConvertToList {
                    ordered: args.boolean(0)?,
                }
            }
            "convertToPoem" => {
                args.expect_count(0)?;
                Rewrite::ConvertToPoem
            }
            "transformNavList" => {
                args.expect_count(0)?;
                Rewrite::TransformNavList
            }
            "wrapList" => {
                args.expect_count(2)?;
                Rewrite::WrapList {
                    pre_content: args.number(0)?,
                    wrapper: args.element(1)?,
                }
            }
            "wrapListInPrevious" => {
                args.expect_count(0)?;
                Rewrite::WrapListInPrevious
            }
            "wrapInFigure" => {
                args.expect_count(2)?;
                Rewrite::WrapInFigure {
                    caption_blocks: args.number(0)?,
                    caption_before: args.boolean(1)?,
                }
            }
            "removeHiddenBox" => {
                args.expect_count(0)?;
                Rewrite::RemoveHiddenBox
            }
            "markupPageBreak" => {
                args.expect_count(0)?;
                Rewrite::MarkupPageBreak
            }
            other => return Err(args.error(format!("unknown rewrite {other:?}"))),
        };
        Ok(rewrite)
    }
}

impl TryFrom<String> for Rewrite {
    type Error = InvalidInvocation;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rewrite> for String {
    fn from(rewrite: Rewrite) -> Self {
        rewrite.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("transformTable(true)", Rewrite::TransformTable { single_row: true })]
    #[case("markupHeading(Transformer.H1)", Rewrite::MarkupHeading { element: html::heading(1).unwrap() })]
    #[case("markupHeading(h2)", Rewrite::MarkupHeading { element: html::heading(2).unwrap() })]
    #[case(" removeImage ( ) ", Rewrite::RemoveImage)]
    #[case("convertToList(false)", Rewrite::ConvertToList { ordered: false })]
    #[case("wrapList(1, Transformer.DIV)", Rewrite::WrapList { pre_content: 1, wrapper: html::div() })]
    #[case("wrapInFigure(1,true)", Rewrite::WrapInFigure { caption_blocks: 1, caption_before: true })]
    #[case(
        "markupHeadingInHeader(0, H2, HEADER)",
        Rewrite::MarkupHeadingInHeader {
            index: 0,
            heading: html::heading(2).unwrap(),
            header: html::by_constant("header").unwrap(),
        }
    )]
    fn parses_invocations(#[case] invocation: &str, #[case] expected: Rewrite) {
        assert_eq!(invocation.parse::<Rewrite>().unwrap(), expected);
    }

    #[rstest]
    #[case("transformTable")]
    #[case("transformTable(yes)")]
    #[case("transformTable(true, false)")]
    #[case("markupHeading(P)")]
    #[case("markupHeading(BLINK)")]
    #[case("dropTable()")]
    #[case("removeImage(1)")]
    #[case("wrapList(1, {urn:x})")]
    #[case("wrapList(1, {urn:x)")]
    fn rejects_bad_invocations(#[case] invocation: &str) {
        assert!(invocation.parse::<Rewrite>().is_err());
    }

    #[test]
    fn display_parses_back() {
        let all = [
            Rewrite::TransformTable { single_row: false },
            Rewrite::MarkupHeading {
                element: html::heading(3).unwrap(),
            },
            Rewrite::MarkupHeadingInHeader {
                index: 2,
                heading: html::heading(1).unwrap(),
                header: html::by_constant("section").unwrap(),
            },
            Rewrite::RemoveImage,
            Rewrite::ConvertToList { ordered: true },
            Rewrite::ConvertToPoem,
            Rewrite::TransformNavList,
            Rewrite::WrapList {
                pre_content: 2,
                wrapper: html::div(),
            },
            Rewrite::WrapListInPrevious,
            Rewrite::WrapInFigure {
                caption_blocks: 1,
                caption_before: false,
            },
            Rewrite::RemoveHiddenBox,
            Rewrite::MarkupPageBreak,
        ];
        for rewrite in all {
            assert_eq!(rewrite.to_string().parse::<Rewrite>().unwrap(), rewrite);
        }
        assert_eq!(
            Rewrite::MarkupHeading {
                element: html::heading(1).unwrap()
            }
            .to_string(),
            "markupHeading(H1)"
        );
    }

    #[test]
    fn names_without_a_constant_keep_their_namespace() {
        let cases = [
            (
                Rewrite::WrapList {
                    pre_content: 1,
                    wrapper: QualifiedName::local("section"),
                },
                "wrapList(1, {}section)",
            ),
            (
                Rewrite::WrapList {
                    pre_content: 0,
                    wrapper: QualifiedName::namespaced(html::HTML_NS, "blockquote"),
                },
                "wrapList(0, {http://www.w3.org/1999/xhtml}blockquote)",
            ),
            (
                Rewrite::MarkupHeadingInHeader {
                    index: 1,
                    heading: html::heading(2).unwrap(),
                    header: QualifiedName::new(Some("urn:x,y(1)"), Some("ex"), "header"),
                },
                "markupHeadingInHeader(1, H2, {urn:x,y(1)}ex:header)",
            ),
        ];
        for (rewrite, printed) in cases {
            assert_eq!(rewrite.to_string(), printed);
            let json = serde_json::to_string(&rewrite).unwrap();
            let back: Rewrite = serde_json::from_str(&json).unwrap();
            assert_eq!(back, rewrite);
        }
    }

    #[test]
    fn serializes_as_invocation_string() {
        let json = serde_json::to_string(&Rewrite::TransformTable { single_row: true }).unwrap();
        assert_eq!(json, r#""transformTable(true)""#);
        let back: Rewrite = serde_json::from_str(r#""removeHiddenBox()""#).unwrap();
        assert_eq!(back, Rewrite::RemoveHiddenBox);
    }
}
