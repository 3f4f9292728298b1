// ============================================================
// Layer 5 - Sequence Classifiers
// ============================================================
// Two interchangeable classifiers behind one trait:
//
//   SequenceClassifier<B>
//     forward: [batch, seq_len, features] → [batch, K] logits
//
//   WindowedClassifier  - flatten → 256 → 128 → K
//                         each block: Linear → ReLU → BatchNorm → Dropout
//
//   RecurrentClassifier - LSTM(40) → last step → 32 → K
//                         block: Linear → ReLU → Dropout
//
// Training vs inference mode is not a flag on the model: Dropout
// and BatchNorm read `B::ad_enabled()`, so the autodiff model
// trains and `model.valid()` infers.
//
// Reference: Burn Book §3 (Building Blocks)
//            Hochreiter & Schmidhuber (1997) Long Short-Term Memory

use burn::{
    nn::{
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        Lstm, LstmConfig,
    },
    prelude::*,
    tensor::activation::relu,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Shared contract ──────────────────────────────────────────────────────────
/// Anything the trainer and evaluator can drive.
pub trait SequenceClassifier<B: Backend>: Module<B> {
    /// sequences: [batch, seq_len, features] → logits: [batch, num_classes]
    fn forward(&self, sequences: Tensor<B, 3>) -> Tensor<B, 2>;

    fn num_classes(&self) -> usize;
}

/// Builds a fresh classifier on any backend.
///
/// Training needs the model on `Autodiff<B>`, while restoring the best
/// checkpoint for evaluation needs the same architecture on `B`. The
/// generic associated type lets one config produce both.
pub trait ClassifierBuilder {
    type Model<B: Backend>: SequenceClassifier<B>;

    fn build<B: Backend>(&self, device: &B::Device) -> Self::Model<B>;
}

/// Which classifier an experiment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    Windowed,
    Recurrent,
}

impl ClassifierKind {
    /// Epoch budget used when none is given explicitly.
    pub fn default_max_epochs(self) -> usize {
        match self {
            ClassifierKind::Windowed  => 25,
            ClassifierKind::Recurrent => 20,
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierKind::Windowed  => write!(f, "windowed"),
            ClassifierKind::Recurrent => write!(f, "recurrent"),
        }
    }
}

// ─── Dense block ──────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct DenseBlock<B: Backend> {
    pub linear:  Linear<B>,
    pub norm:    Option<BatchNorm<B, 1>>,
    pub dropout: Dropout,
}

impl<B: Backend> DenseBlock<B> {
    fn new(d_in: usize, d_out: usize, batch_norm: bool, dropout: f64, device: &B::Device) -> Self {
        Self {
            linear:  LinearConfig::new(d_in, d_out).init(device),
            norm:    batch_norm.then(|| BatchNormConfig::new(d_out).init(device)),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    /// x: [batch, d_in] → [batch, d_out]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.linear.forward(x));
        let x = match &self.norm {
            // BatchNorm wants [batch, channels, length]
            Some(norm) => norm.forward(x.unsqueeze_dim::<3>(2)).squeeze::<2>(2),
            None       => x,
        };
        self.dropout.forward(x)
    }
}

// ─── Variant A: windowed MLP ──────────────────────────────────────────────────
// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally - do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct WindowedClassifierConfig {
    pub seq_len:       usize,
    pub feature_count: usize,
    pub num_classes:   usize,
    #[config(default = 256)]
    pub hidden_1:      usize,
    #[config(default = 128)]
    pub hidden_2:      usize,
    #[config(default = 0.25)]
    pub dropout:       f64,
}

impl WindowedClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> WindowedClassifier<B> {
        let d_in   = self.seq_len * self.feature_count;
        let blocks = vec![
            DenseBlock::new(d_in, self.hidden_1, true, self.dropout, device),
            DenseBlock::new(self.hidden_1, self.hidden_2, true, self.dropout, device),
        ];
        let head = LinearConfig::new(self.hidden_2, self.num_classes).init(device);
        WindowedClassifier { blocks, head, num_classes: self.num_classes }
    }
}

#[derive(Module, Debug)]
pub struct WindowedClassifier<B: Backend> {
    pub blocks:      Vec<DenseBlock<B>>,
    pub head:        Linear<B>,
    pub num_classes: usize,
}

impl<B: Backend> SequenceClassifier<B> for WindowedClassifier<B> {
    fn forward(&self, sequences: Tensor<B, 3>) -> Tensor<B, 2> {
        // [batch, seq_len, features] → [batch, seq_len * features]
        let mut x = sequences.flatten::<2>(1, 2);
        for block in &self.blocks {
            x = block.forward(x);
        }
        self.head.forward(x)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

impl ClassifierBuilder for WindowedClassifierConfig {
    type Model<B: Backend> = WindowedClassifier<B>;

    fn build<B: Backend>(&self, device: &B::Device) -> Self::Model<B> {
        self.init(device)
    }
}

// ─── Variant B: LSTM ──────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct RecurrentClassifierConfig {
    pub feature_count: usize,
    pub num_classes:   usize,
    #[config(default = 40)]
    pub lstm_hidden:   usize,
    #[config(default = 32)]
    pub dense_hidden:  usize,
    #[config(default = 0.4)]
    pub dropout:       f64,
}

impl RecurrentClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RecurrentClassifier<B> {
        RecurrentClassifier {
            lstm:        LstmConfig::new(self.feature_count, self.lstm_hidden, true).init(device),
            block:       DenseBlock::new(self.lstm_hidden, self.dense_hidden, false, self.dropout, device),
            head:        LinearConfig::new(self.dense_hidden, self.num_classes).init(device),
            num_classes: self.num_classes,
        }
    }
}

#[derive(Module, Debug)]
pub struct RecurrentClassifier<B: Backend> {
    pub lstm:        Lstm<B>,
    pub block:       DenseBlock<B>,
    pub head:        Linear<B>,
    pub num_classes: usize,
}

impl<B: Backend> SequenceClassifier<B> for RecurrentClassifier<B> {
    fn forward(&self, sequences: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, seq_len, _] = sequences.dims();

        // Fresh zero state per call: nothing carries across windows.
        let (output, _) = self.lstm.forward(sequences, None); // [batch, seq_len, hidden]
        let hidden      = output.dims()[2];
        let last        = output
            .slice([0..batch, seq_len - 1..seq_len, 0..hidden])
            .reshape([batch, hidden]);

        self.head.forward(self.block.forward(last))
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

impl ClassifierBuilder for RecurrentClassifierConfig {
    type Model<B: Backend> = RecurrentClassifier<B>;

    fn build<B: Backend>(&self, device: &B::Device) -> Self::Model<B> {
        self.init(device)
    }
}
