use crate::error::Result;

/// A half-duplex command/response channel to a contactless tag.
///
/// Implementations send one command frame and return the raw response,
/// including the 2-byte status trailer. Interpreting the trailer is left to
/// the layers above.
pub trait TagTransport {
    /// Send `command` and wait for the tag's response.
    ///
    /// `max_response_len` is the largest response (data + trailer) the caller
    /// is prepared to receive.
    fn transmit(&mut self, command: &[u8], max_response_len: usize) -> Result<Vec<u8>>;

    /// Human-readable reader name, used in logs and reports.
    fn name(&self) -> &str {
        "unknown"
    }
}

impl<T: TagTransport + ?Sized> TagTransport for &mut T {
    fn transmit(&mut self, command: &[u8], max_response_len: usize) -> Result<Vec<u8>> {
        (**self).transmit(command, max_response_len)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: TagTransport + ?Sized> TagTransport for Box<T> {
    fn transmit(&mut self, command: &[u8], max_response_len: usize) -> Result<Vec<u8>> {
        (**self).transmit(command, max_response_len)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    struct Echo;

    impl TagTransport for Echo {
        fn transmit(&mut self, command: &[u8], max_response_len: usize) -> Result<Vec<u8>> {
            if command.len() + 2 > max_response_len {
                return Err(TransportError::ResponseTooLong {
                    len: command.len() + 2,
                    max: max_response_len,
                });
            }
            let mut out = command.to_vec();
            out.extend_from_slice(&[0x90, 0x00]);
            Ok(out)
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn mutable_reference_forwards() {
        let mut echo = Echo;
        let mut by_ref = &mut echo;
        let out = by_ref.transmit(&[1, 2], 16).unwrap();
        assert_eq!(out, vec![1, 2, 0x90, 0x00]);
        assert_eq!(by_ref.name(), "echo");
    }

    #[test]
    fn boxed_trait_object_forwards() {
        let mut boxed: Box<dyn TagTransport> = Box::new(Echo);
        let err = boxed.transmit(&[0; 8], 4).unwrap_err();
        assert!(matches!(err, TransportError::ResponseTooLong { len: 10, max: 4 }));
        assert_eq!(boxed.name(), "echo");
    }

    #[test]
    fn default_name_is_unknown() {
        struct Silent;
        impl TagTransport for Silent {
            fn transmit(&mut self, _command: &[u8], _max: usize) -> Result<Vec<u8>> {
                Err(TransportError::NoTag)
            }
        }
        assert_eq!(Silent.name(), "unknown");
    }
}
