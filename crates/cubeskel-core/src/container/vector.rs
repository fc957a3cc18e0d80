use super::DistributedData;
use crate::{ContainerError, Element, distribution::Layout};
use cubeskel_runtime::server::ComputeServer;

/// A one dimensional distributed container.
///
/// Element access goes through `&mut self` because reading may first download the data from
/// the devices.
#[derive(Debug)]
pub struct Vector<T: Element, S: ComputeServer> {
    data: DistributedData<T, S>,
}

impl<T: Element, S: ComputeServer> Vector<T, S> {
    /// An empty vector.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// A vector holding `values`.
    pub fn from_vec(values: Vec<T>) -> Self {
        let layout = Layout::vector(values.len());
        Self {
            data: DistributedData::new(values, layout),
        }
    }

    /// A vector of `len` copies of `value`.
    pub fn filled(len: usize, value: T) -> Self {
        Self::from_vec(vec![value; len])
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.data.size()
    }

    /// Whether the vector holds no element.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resizes to `len` elements, filling new slots with `value`.
    ///
    /// Existing device buffers are dropped.
    pub fn resize(&mut self, len: usize, value: T) -> Result<(), ContainerError> {
        self.data.reshape(Layout::vector(len), |host| host.resize(len, value))
    }

    /// Appends an element.
    ///
    /// Like [`resize`](Self::resize), this drops existing device buffers.
    pub fn push(&mut self, value: T) -> Result<(), ContainerError> {
        let len = self.len() + 1;
        self.data.reshape(Layout::vector(len), |host| host.push(value))
    }

    /// The element at `index`.
    pub fn get(&mut self, index: usize) -> Result<T, ContainerError> {
        self.data.get(index)
    }

    /// Replaces the element at `index`.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), ContainerError> {
        self.data.set(index, value)
    }

    /// The first element.
    pub fn front(&mut self) -> Result<T, ContainerError> {
        self.get(0)
    }

    /// The last element.
    pub fn back(&mut self) -> Result<T, ContainerError> {
        match self.len() {
            0 => Err(ContainerError::IndexOutOfRange { index: 0, len: 0 }),
            len => self.get(len - 1),
        }
    }

    /// The elements.
    pub fn as_slice(&mut self) -> Result<&[T], ContainerError> {
        self.data.host_data()
    }

    /// The elements, mutable. The devices are considered behind afterwards.
    pub fn as_mut_slice(&mut self) -> Result<&mut [T], ContainerError> {
        self.data.host_data_mut()
    }

    /// The elements, downloaded if needed.
    pub fn into_vec(self) -> Result<Vec<T>, ContainerError> {
        self.data.into_host()
    }
}

impl<T: Element, S: ComputeServer> Default for Vector<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element, S: ComputeServer> From<Vec<T>> for Vector<T, S> {
    fn from(values: Vec<T>) -> Self {
        Self::from_vec(values)
    }
}

impl<T: Element, S: ComputeServer> FromIterator<T> for Vector<T, S> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: Element, S: ComputeServer> core::ops::Deref for Vector<T, S> {
    type Target = DistributedData<T, S>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T: Element, S: ComputeServer> core::ops::DerefMut for Vector<T, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}
