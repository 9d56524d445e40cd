use memelang_core::{decode, encode};

#[test]
fn bare_relation_round_trips() {
    let tokens = decode("parent").unwrap();
    let text = encode(&tokens);
    assert_eq!(decode(&text).unwrap(), tokens);
}

#[test]
fn equality_promotion_round_trips() {
    let tokens = decode("year=1700").unwrap();
    let text = encode(&tokens);
    let reparsed = decode(&text).unwrap();
    assert_eq!(reparsed, tokens);
}

#[test]
fn quoted_string_round_trips_with_embedded_quote() {
    let tokens = decode("=\"John \\\"Q\\\" Adams\"").unwrap();
    let text = encode(&tokens);
    assert_eq!(decode(&text).unwrap(), tokens);
}

#[test]
fn multi_statement_job_round_trips() {
    let tokens = decode("child;spouse=a5").unwrap();
    assert_eq!(tokens.len(), 2);
    let text = encode(&tokens);
    assert_eq!(decode(&text).unwrap(), tokens);
}

#[test]
fn comment_lines_are_stripped() {
    let tokens = decode("parent // a trailing comment\n").unwrap();
    assert_eq!(decode("parent").unwrap(), tokens);
}
