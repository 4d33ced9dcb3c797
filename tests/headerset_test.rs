use slimnet::{HeaderSet, NetError};

fn naive_split(raw: &str) -> HeaderSet {
    let mut set = HeaderSet::new();
    for line in raw.split("\r\n").skip(1) {
        if let Some((k, v)) = line.split_once(':') {
            set.add(k, v.strip_prefix(' ').unwrap_or(v));
        }
    }
    set
}

#[test]
fn test_single_hop_equals_plain_parse() {
    let blobs = [
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n",
        "HTTP/2 204 \r\nx-a: 1\r\nx-b: 2\r\nx-a: 3\r\n\r\n",
        "HTTP/1.0 404 Not Found\r\n\r\n",
    ];
    for raw in blobs {
        assert_eq!(HeaderSet::from_raw(raw), naive_split(raw), "blob {:?}", raw);
    }
}

#[test]
fn test_multi_hop_keeps_final_block() {
    let final_hop = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nX-Final: yes\r\n\r\n";
    let raw = format!(
        "HTTP/1.1 301 Moved Permanently\r\nLocation: /one\r\nX-Hop: 1\r\n\r\n\
         HTTP/1.1 301 Moved Permanently\r\nLocation: /two\r\nX-Hop: 2\r\n\r\n{}",
        final_hop
    );

    let set = HeaderSet::from_raw(&raw);
    assert_eq!(set, naive_split(final_hop));
    assert_eq!(set.at("x-final").unwrap(), "yes");
    assert!(set.get("x-hop").is_none());
    assert!(set.get("location").is_none());
}

#[test]
fn test_repeated_header_merges() {
    let set = HeaderSet::from_raw("HTTP/1.1 200 OK\r\nX-List: a\r\nX-List: b\r\nX-List: c\r\n\r\n");
    assert_eq!(set.at("x-list").unwrap(), "a, b, c");
}

#[test]
fn test_at_is_case_insensitive() {
    let set = HeaderSet::from_raw("HTTP/1.1 200 OK\r\nContent-Length: 42\r\n\r\n");
    for key in ["content-length", "Content-Length", "CONTENT-LENGTH"] {
        assert_eq!(set.at(key).unwrap(), "42");
    }
}

#[test]
fn test_at_reports_missing_key() {
    let set = HeaderSet::from_raw("HTTP/1.1 200 OK\r\n\r\n");
    match set.at("x-nope") {
        Err(NetError::HeaderNotFound(key)) => assert_eq!(key, "x-nope"),
        other => panic!("unexpected {:?}", other),
    }
}
