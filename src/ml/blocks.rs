// ============================================================
// Layer 5 - Encoder and Decoder Blocks
// ============================================================
// Post-norm residual blocks built from Burn's stock layers:
//
//   EncoderBlock:  x = norm1(x + drop(self_attn(x, mask)))
//                  x = norm2(x + drop(ffn(x)))
//
//   DecoderBlock:  x = norm1(x + drop(self_attn(x, tgt_mask)))
//                  x = norm2(x + drop(cross_attn(x, memory, memory_mask)))
//                  x = norm3(x + drop(ffn(x)))
//
//   ffn(x) = linear2(gelu(linear1(x)))
//
// Reference: Vaswani et al. (2017) section 3.1
//            Burn Book section 3 (Building Blocks)

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::gelu,
};

use crate::ml::error::Result;
use crate::ml::layers::EncoderLayer;
use crate::ml::mask::attention_mask;

#[derive(Config, Debug)]
pub struct BlockConfig {
    pub d_model:   usize,
    pub num_heads: usize,
    pub d_ff:      usize,
    #[config(default = 0.1)]
    pub dropout:   f64,
}

impl BlockConfig {
    pub fn init_encoder<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            self_attn:   self.attention(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }

    pub fn init_decoder<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        DecoderBlock {
            self_attn:   self.attention(device),
            cross_attn:  self.attention(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
            norm3:       LayerNormConfig::new(self.d_model).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }

    fn attention<B: Backend>(&self, device: &B::Device) -> MultiHeadAttention<B> {
        MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device)
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderLayer<B> for EncoderBlock<B> {
    fn forward(&self, x: Tensor<B, 3>, mask: Option<Tensor<B, 2>>) -> Result<Tensor<B, 3>> {
        let [batch, seq_len, _] = x.dims();

        let mut input = MhaInput::self_attn(x.clone());
        if let Some(mask) = mask {
            input = input.mask_attn(attention_mask(
                mask, batch, seq_len, seq_len, "encoder self-attention mask",
            )?);
        }
        let attn_output = self.self_attn.forward(input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));

        let ffn_out = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        Ok(self.norm2.forward(x + self.dropout.forward(ffn_out)))
    }
}

#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub cross_attn:  MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub norm3:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    /// Masks are already in Burn's boolean form; the decoder converts
    /// them once for the whole stack.
    pub fn forward(
        &self,
        x:           Tensor<B, 3>,
        memory:      Tensor<B, 3>,
        tgt_mask:    Option<Tensor<B, 3, Bool>>,
        memory_mask: Option<Tensor<B, 3, Bool>>,
    ) -> Tensor<B, 3> {
        let mut self_input = MhaInput::self_attn(x.clone());
        if let Some(mask) = tgt_mask {
            self_input = self_input.mask_attn(mask);
        }
        let attn_output = self.self_attn.forward(self_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));

        let mut cross_input = MhaInput::new(x.clone(), memory.clone(), memory);
        if let Some(mask) = memory_mask {
            cross_input = cross_input.mask_attn(mask);
        }
        let cross_output = self.cross_attn.forward(cross_input).context;
        let x = self.norm2.forward(x + self.dropout.forward(cross_output));

        let ffn_out = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        self.norm3.forward(x + self.dropout.forward(ffn_out))
    }
}
