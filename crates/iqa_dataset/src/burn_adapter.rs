//! Conversion of decoded samples into Burn tensors.

use crate::types::{ImageArray, IqaSample};
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

impl ImageArray {
    /// `[height, width, 3]` tensor holding the normalized RGB values.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 3> {
        let dims = self.shape().dims();
        Tensor::<B, 3>::from_data(TensorData::new(self.data.clone(), dims), device)
    }
}

impl IqaSample {
    /// Reference image, distorted image, and the score as a one-element tensor.
    pub fn to_tensors<B: Backend>(
        &self,
        device: &B::Device,
    ) -> (Tensor<B, 3>, Tensor<B, 3>, Tensor<B, 1>) {
        let mos = Tensor::<B, 1>::from_data(TensorData::new(vec![self.mos], [1]), device);
        (
            self.reference.to_tensor::<B>(device),
            self.distorted.to_tensor::<B>(device),
            mos,
        )
    }
}
