//! End-to-end canonicalization: parse with the external parser, rebuild the
//! tree, render, and check the normalized output. The last test pins the
//! idempotence property over a corpus of messy documents.

use mdcanon::canonicalize;
use pretty_assertions::assert_eq;

fn canon(source: &str) -> String {
    canonicalize(source).unwrap()
}

#[test]
fn test_ordered_list_renumbering() {
    assert_eq!(canon("1. a\n1. b\n1. c\n"), "1. a\n2. b\n3. c\n");
}

#[test]
fn test_ordered_list_keeps_start_number() {
    assert_eq!(canon("3. x\n5. y\n"), "3. x\n4. y\n");
}

#[test]
fn test_thematic_break_spellings_normalize() {
    for spelling in ["***\n", "___\n", "- - -\n", "*****\n"] {
        assert_eq!(canon(spelling), "---\n", "for input {spelling:?}");
    }
}

#[test]
fn test_tab_and_space_nesting_converge() {
    let canonical = "1. element 1\n    1. element 2\n";
    assert_eq!(canon("1. element 1\n\t1. element 2\n"), canonical);
    assert_eq!(canon("1. element 1\n    1. element 2\n"), canonical);
}

#[test]
fn test_bullet_marker_is_preserved() {
    assert_eq!(canon("* x\n* y\n"), "* x\n* y\n");
    assert_eq!(canon("- x\n- y\n"), "- x\n- y\n");
}

#[test]
fn test_outer_numbering_resumes_after_nested_list() {
    let bulleted = "1. a\n    - x\n2. b\n";
    assert_eq!(canon(bulleted), bulleted);
    let numbered = "1. a\n    1. x\n2. b\n";
    assert_eq!(canon(numbered), numbered);
}

#[test]
fn test_blockquote_inside_list_item() {
    assert_eq!(canon("- > q\n"), "- > q\n");
}

#[test]
fn test_lazy_blockquote_continuation_gets_prefixed() {
    assert_eq!(canon("> quote 1\nquote 2\n"), "> quote 1\n> quote 2\n");
}

#[test]
fn test_blockquote_paragraphs_split_into_quotes() {
    assert_eq!(canon("> a\n>\n> b\n"), "> a\n\n> b\n");
}

#[test]
fn test_lazy_list_continuation_is_indented() {
    assert_eq!(canon("- a\npara\n"), "- a\n  para\n");
}

#[test]
fn test_setext_heading_becomes_atx() {
    assert_eq!(canon("title\n=====\n"), "# title\n");
}

#[test]
fn test_indented_code_becomes_fenced() {
    assert_eq!(canon("    code\n"), "```\ncode\n```\n");
}

#[test]
fn test_underscore_emphasis_becomes_asterisks() {
    assert_eq!(canon("_hi_ and __there__\n"), "*hi* and **there**\n");
}

#[test]
fn test_hard_break_becomes_plain_newline() {
    assert_eq!(canon("a  \nb\n"), "a\nb\n");
}

#[test]
fn test_code_span_newlines_become_spaces() {
    assert_eq!(canon("a `b\nc` d\n"), "a `b c` d\n");
}

#[test]
fn test_blank_runs_collapse_to_one() {
    assert_eq!(canon("a\n\n\n\nb\n"), "a\n\nb\n");
}

#[test]
fn test_table_round_trip() {
    let source = "| foo | bar |\n| --- | --- |\n| baz | bim |\n";
    assert_eq!(canon(source), source);
}

#[test]
fn test_task_list_round_trip() {
    let source = "- [ ] task 1\n- [x] task 2\n";
    assert_eq!(canon(source), source);
}

#[test]
fn test_autolinks() {
    assert_eq!(
        canon("<https://example.com/>\n"),
        "[https://example.com/](https://example.com/)\n"
    );
    assert_eq!(
        canon("<user@example.com>\n"),
        "[user@example.com](mailto:user@example.com)\n"
    );
}

#[test]
fn test_html_block_is_verbatim() {
    let source = "<div>\nhello\n</div>\n";
    assert_eq!(canon(source), source);
}

#[test]
fn test_inline_html_is_verbatim() {
    let source = "a <b>bold</b> word\n";
    assert_eq!(canon(source), source);
}

#[test]
fn test_canonical_form_is_idempotent() {
    let corpus = [
        "# heading\n\nthis is text\n",
        "1. a\n1. b\n1. c\n",
        "- a\npara\n",
        "1. element 1\n\t1. nested\n",
        "1. a\n    - x\n2. b\n",
        "- > q\n",
        "> quote 1\nquote 2\n",
        "> a\n>\n> b\n",
        "title\n=====\n",
        "    code\n",
        "***\n",
        "| foo | bar |\n| --- | --- |\n| baz | bim |\n",
        "- [ ] task 1\n- [x] task 2\n",
        "a `b\nc` d\n",
        "<https://example.com/> and <user@example.com>\n",
        concat!(
            "Title\n",
            "=====\n",
            "\n",
            "intro *text* with [a link](dest) and `code`.\n",
            "\n",
            "1. one\n",
            "1. two\n",
            "\t1. nested\n",
            "> quoted\n",
            "continuation\n",
            "\n",
            "    indented code\n",
            "\n",
            "| a | b |\n",
            "| :-- | --: |\n",
            "| c | d |\n",
            "\n",
            "***\n",
            "\n",
            "- [ ] todo\n",
            "- [x] done\n",
        ),
    ];
    for document in corpus {
        let once = canon(document);
        let twice = canon(&once);
        assert_eq!(twice, once, "canonical form drifted for {document:?}");
    }
}
