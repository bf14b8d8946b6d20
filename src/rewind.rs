use crate::request::{Body, PartContent};
use anyhow::{Context, Result};
use tracing::debug;

/// Reset every streamable part of `body` to its first byte.
///
/// In-memory bodies need nothing. A part that fails to rewind aborts the
/// retry: the error is returned with the part name attached.
pub fn rewind_body(body: &mut Body) -> Result<()> {
    let streams = body.stream_parts();
    let Body::Multipart(parts) = body else {
        return Ok(());
    };
    if streams == 0 {
        return Ok(());
    }

    for part in parts.iter_mut() {
        if let PartContent::Stream(stream) = &mut part.content {
            stream
                .rewind()
                .with_context(|| format!("failed to rewind multipart part {:?}", part.name))?;
        }
    }

    debug!("Rewound {} stream part(s) for resend", streams);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Part;
    use std::io::{self, Cursor, Read, Seek, SeekFrom};

    struct Unrewindable;

    impl Read for Unrewindable {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl Seek for Unrewindable {
        fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
            Err(io::Error::new(io::ErrorKind::Unsupported, "pipe"))
        }
    }

    #[test]
    fn test_rewind_resets_every_stream_part() {
        let mut body = Body::Multipart(vec![
            Part::stream("a", "a.txt", "text/plain", Cursor::new(b"first".to_vec())),
            Part::text("field", "value"),
            Part::stream("b", "b.txt", "text/plain", Cursor::new(b"second".to_vec())),
        ]);

        if let Body::Multipart(parts) = &mut body {
            for part in parts.iter_mut() {
                if let PartContent::Stream(stream) = &mut part.content {
                    let mut sink = Vec::new();
                    stream.read_to_end(&mut sink).unwrap();
                }
            }
        }

        rewind_body(&mut body).unwrap();

        let Body::Multipart(parts) = &mut body else {
            panic!("body changed shape");
        };
        let mut text = String::new();
        if let PartContent::Stream(stream) = &mut parts[2].content {
            stream.read_to_string(&mut text).unwrap();
        }
        assert_eq!(text, "second");
    }

    #[test]
    fn test_in_memory_bodies_are_untouched() {
        let mut body = Body::Text("payload".into());
        rewind_body(&mut body).unwrap();
        assert!(matches!(body, Body::Text(ref t) if t == "payload"));
    }

    #[test]
    fn test_rewind_failure_propagates() {
        let mut body = Body::Multipart(vec![Part::stream(
            "file",
            "f.bin",
            "application/octet-stream",
            Unrewindable,
        )]);
        let err = rewind_body(&mut body).unwrap_err();
        assert!(err.to_string().contains("\"file\""));
        assert_eq!(
            err.downcast_ref::<io::Error>().map(|e| e.kind()),
            Some(io::ErrorKind::Unsupported)
        );
    }
}
