/// Type-state markers for the builder pattern
///
/// These types track at compile time whether the endpoint has been set,
/// so `build()` only exists on a complete configuration.

use std::marker::PhantomData;

/// Marker trait for endpoint state
pub trait EndpointState {}

/// Endpoint has not been set
pub struct NoEndpoint;
impl EndpointState for NoEndpoint {}

/// Endpoint has been set
pub struct HasEndpoint;
impl EndpointState for HasEndpoint {}

/// Phantom marker to prevent direct construction
#[derive(Debug, Clone, Copy)]
pub struct TypeState<E> {
    _endpoint: PhantomData<E>,
}

impl<E> TypeState<E> {
    pub(crate) fn new() -> Self {
        Self {
            _endpoint: PhantomData,
        }
    }
}

impl<E> Default for TypeState<E> {
    fn default() -> Self {
        Self::new()
    }
}
