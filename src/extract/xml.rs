use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// Every non-blank text node in document order, space-joined. Mismatched
/// end tags and undecodable entities are tolerated; a hard syntax error
/// keeps whatever text was collected before it.
pub fn extract_text(bytes: &[u8]) -> String {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().check_end_names = false;

    let mut parts: Vec<String> = Vec::new();

    let mut last_pos = reader.buffer_position();
    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => match e.unescape() {
                Ok(text) => keep(&mut parts, &text),
                Err(_) => keep(&mut parts, &String::from_utf8_lossy(&e)),
            },
            Ok(Event::CData(e)) => keep(&mut parts, &String::from_utf8_lossy(&e.into_inner())),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                let pos = reader.buffer_position();
                tracing::debug!(error = %e, position = pos, "xml recovery");
                if pos == last_pos { break; }
            }
        }
        last_pos = reader.buffer_position();
    }
    parts.join(" ")
}

fn keep(parts: &mut Vec<String>, raw: &str) {
    let t = raw.trim();
    if !t.is_empty() { parts.push(t.to_string()); }
}
