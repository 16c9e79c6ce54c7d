//! Ownership of the backend handles a decoder keeps for its whole lifetime.

use crate::backend::DecodeBackend;
use crate::error::DecodeError;

/// Handles acquired by [`DecodeSession::open`].
pub struct SessionHandles<B: DecodeBackend> {
    pub context: B::Context,
    pub decode_state: B::DecodeState,
    pub parser: B::StreamParser,
    pub stream: B::Stream,
    pub start_event: B::Event,
    pub stop_event: B::Event,
    pub params: B::DecodeParams,
}

/// One backend plus the handles bound to it.
///
/// Handles are released in reverse acquisition order when the session is
/// closed or dropped. Release failures are logged and do not stop the
/// remaining releases.
pub struct DecodeSession<B: DecodeBackend> {
    backend: B,
    handles: Option<SessionHandles<B>>,
    rgb_output: bool,
}

/// Handles acquired so far while opening a session.
struct PartialHandles<'b, B: DecodeBackend> {
    backend: &'b B,
    context: Option<B::Context>,
    decode_state: Option<B::DecodeState>,
    parser: Option<B::StreamParser>,
    stream: Option<B::Stream>,
    start_event: Option<B::Event>,
    stop_event: Option<B::Event>,
    params: Option<B::DecodeParams>,
}

impl<'b, B: DecodeBackend> PartialHandles<'b, B> {
    fn new(backend: &'b B) -> Self {
        Self {
            backend,
            context: None,
            decode_state: None,
            parser: None,
            stream: None,
            start_event: None,
            stop_event: None,
            params: None,
        }
    }

    fn finish(mut self) -> Result<SessionHandles<B>, DecodeError> {
        match (
            self.context.take(),
            self.decode_state.take(),
            self.parser.take(),
            self.stream.take(),
            self.start_event.take(),
            self.stop_event.take(),
            self.params.take(),
        ) {
            (
                Some(context),
                Some(decode_state),
                Some(parser),
                Some(stream),
                Some(start_event),
                Some(stop_event),
                Some(params),
            ) => Ok(SessionHandles {
                context,
                decode_state,
                parser,
                stream,
                start_event,
                stop_event,
                params,
            }),
            _ => Err(DecodeError::NotInitialized),
        }
    }
}

impl<B: DecodeBackend> Drop for PartialHandles<'_, B> {
    fn drop(&mut self) {
        let backend = self.backend;
        if let Some(params) = self.params.take() {
            let _ = report("decode params", backend.destroy_decode_params(params));
        }
        if let Some(event) = self.stop_event.take() {
            let _ = report("stop event", backend.destroy_event(event));
        }
        if let Some(event) = self.start_event.take() {
            let _ = report("start event", backend.destroy_event(event));
        }
        if let Some(stream) = self.stream.take() {
            let _ = report("stream", backend.destroy_stream(stream));
        }
        if let Some(parser) = self.parser.take() {
            let _ = report("stream parser", backend.destroy_stream_parser(parser));
        }
        if let Some(state) = self.decode_state.take() {
            let _ = report("decode state", backend.destroy_decode_state(state));
        }
        if let Some(context) = self.context.take() {
            let _ = report("context", backend.destroy_context(context));
        }
    }
}

fn report(what: &str, result: Result<(), DecodeError>) -> Result<(), DecodeError> {
    if let Err(e) = result {
        log::warn!("could not release {}: {}", what, e);
    }
    result
}

impl<B: DecodeBackend> DecodeSession<B> {
    /// Acquires every handle in order: context, decode state, stream parser,
    /// stream, start event, stop event, decode parameters.
    ///
    /// On failure the handles acquired so far are released before the error
    /// is returned.
    pub fn open(backend: B, rgb_output: bool) -> Result<Self, DecodeError> {
        let rgb_output = if rgb_output && !backend.supports_rgb_output() {
            log::info!("backend has no RGB output mode, components decode at their own size");
            false
        } else {
            rgb_output
        };

        let handles = {
            let mut partial = PartialHandles::new(&backend);
            let context = backend.create_context()?;
            let decode_state = backend.create_decode_state(&context);
            partial.context = Some(context);
            partial.decode_state = Some(decode_state?);
            partial.parser = Some(backend.create_stream_parser()?);
            partial.stream = Some(backend.create_stream()?);
            partial.start_event = Some(backend.create_event()?);
            partial.stop_event = Some(backend.create_event()?);
            let mut params = backend.create_decode_params()?;
            if backend.supports_rgb_output() {
                let set = backend.set_rgb_output(&mut params, rgb_output);
                partial.params = Some(params);
                set?;
            } else {
                partial.params = Some(params);
            }
            partial.finish()?
        };

        Ok(Self {
            backend,
            handles: Some(handles),
            rgb_output,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn rgb_output(&self) -> bool {
        self.rgb_output
    }

    /// The backend and the live handles, borrowed together.
    pub fn parts(&mut self) -> Result<(&B, &mut SessionHandles<B>), DecodeError> {
        let handles = self.handles.as_mut().ok_or(DecodeError::NotInitialized)?;
        Ok((&self.backend, handles))
    }

    /// Releases every handle and returns the first release failure, if any.
    pub fn close(mut self) -> Result<(), DecodeError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), DecodeError> {
        let Some(h) = self.handles.take() else {
            return Ok(());
        };
        let backend = &self.backend;
        let results = [
            report("decode params", backend.destroy_decode_params(h.params)),
            report("stop event", backend.destroy_event(h.stop_event)),
            report("start event", backend.destroy_event(h.start_event)),
            report("stream", backend.destroy_stream(h.stream)),
            report("stream parser", backend.destroy_stream_parser(h.parser)),
            report("decode state", backend.destroy_decode_state(h.decode_state)),
            report("context", backend.destroy_context(h.context)),
        ];
        results.into_iter().find(Result::is_err).unwrap_or(Ok(()))
    }
}

impl<B: DecodeBackend> Drop for DecodeSession<B> {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
