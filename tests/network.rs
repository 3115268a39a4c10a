use std::sync::{Arc, Mutex};

use ffnet::component::{Component, Dimensions, LossFunction};
use ffnet::data::DataPoint;
use ffnet::layers::Dense;
use ffnet::loss::SquaredError;
use ffnet::network::Network;
use ffnet::tensor;
use ffnet::tensors::{Ten64, Tensor, WithGrad};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// What a recorder saw during one backward call.
#[derive(Debug, Clone, PartialEq)]
struct Seen {
    id: usize,
    input: Ten64,
    output_gradient: Ten64,
}

/// Adds 1 on the way forward, passes the gradient straight through on the
/// way back, and records every backward call.
#[derive(Debug, Clone)]
struct Recorder {
    id: usize,
    width: usize,
    log: Arc<Mutex<Vec<Seen>>>,
    params: Vec<WithGrad<Ten64>>,
}

impl Recorder {
    fn new(id: usize, width: usize, log: &Arc<Mutex<Vec<Seen>>>) -> Self {
        Self {
            id,
            width,
            log: Arc::clone(log),
            params: vec![WithGrad::new(Tensor::new(vec![width], vec![1.0; width]))],
        }
    }
}

impl Component for Recorder {
    fn dimensions(&self) -> Dimensions {
        Dimensions::new([self.width], [self.width])
    }

    fn apply(&self, input: &Ten64, output: &mut Ten64) {
        *output = Tensor::new(input.shape.clone(), input.data.iter().map(|x| x + 1.0).collect());
    }

    fn backprop(&mut self, input: &Ten64, _output: &Ten64, output_gradient: &Ten64) -> Ten64 {
        self.log.lock().unwrap().push(Seen {
            id: self.id,
            input: input.clone(),
            output_gradient: output_gradient.clone(),
        });
        for g in &mut self.params[0].grad.data {
            *g += 1.0;
        }
        output_gradient.clone()
    }

    fn params(&self) -> &[WithGrad<Ten64>] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [WithGrad<Ten64>] {
        &mut self.params
    }

    fn copy(&self) -> Box<dyn Component> {
        let mut c = self.clone();
        c.params = self.params.iter().map(WithGrad::detached).collect();
        Box::new(c)
    }

    fn describe(&self) -> String {
        format!("Recorder#{}", self.id)
    }
}

/// A loss that must never be consulted.
#[derive(Debug)]
struct Untouchable;

impl LossFunction for Untouchable {
    fn dimensions(&self) -> Vec<usize> {
        vec![2]
    }

    fn apply(&self, _output: &Ten64, _correct: &[usize]) -> f64 {
        panic!("loss applied")
    }

    fn backprop(&self, _output: &Ten64, _correct: &[usize]) -> Ten64 {
        panic!("loss differentiated")
    }

    fn copy(&self) -> Box<dyn LossFunction> {
        Box::new(Untouchable)
    }

    fn describe(&self) -> String {
        "Untouchable".into()
    }
}

fn linear() -> Network {
    Network::new(
        vec![Box::new(Dense::from_parameters(
            tensor!([[1.0, 2.0], [0.0, 1.0]]),
            tensor!([0.5, -0.5]),
        ))],
        Box::new(SquaredError::new(2)),
    )
}

fn points() -> Vec<DataPoint> {
    vec![
        DataPoint::sample(vec![1.0, 1.0], vec![0]),
        DataPoint::sample(vec![2.0, -1.0], vec![1]),
    ]
}

#[test]
fn zero_component_backprop_is_a_no_op() {
    init_logging();
    let mut net = Network::new(Vec::new(), Box::new(Untouchable));
    let p = DataPoint::sample(vec![1.0, 2.0], vec![0]);
    net.backprop(&p);
    net.zero_grad();
    assert_eq!(net.num_params(), 0);
    assert!(net.gradients().is_empty());
}

#[test]
fn single_component_reads_raw_input() {
    init_logging();
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut net = Network::new(vec![Box::new(Recorder::new(0, 2, &log))], Box::new(SquaredError::new(2)));
    let p = DataPoint::sample(vec![0.0, 0.5], vec![1]);

    net.backprop(&p);

    let seen = log.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].input, p.input);
    // output [1, 1.5] against target [0, 1]
    assert_eq!(seen[0].output_gradient, tensor!([[2.0, 1.0]]));
}

#[test]
fn chain_threads_cached_outputs_and_gradients_backward() {
    init_logging();
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut net = Network::new(
        (0..3).map(|id| Box::new(Recorder::new(id, 2, &log)) as Box<dyn Component>).collect(),
        Box::new(SquaredError::new(2)),
    );
    let p = DataPoint::sample(vec![0.0, 0.0], vec![0]);

    net.backprop(&p);

    let seen = log.lock().unwrap();
    let order: Vec<usize> = seen.iter().map(|s| s.id).collect();
    assert_eq!(order, vec![2, 1, 0]);
    assert_eq!(seen[0].input, tensor!([[2.0, 2.0]]));
    assert_eq!(seen[1].input, tensor!([[1.0, 1.0]]));
    assert_eq!(seen[2].input, p.input);

    // output [3, 3] against [1, 0]; recorders pass the gradient through unchanged
    let loss_grad = tensor!([[4.0, 6.0]]);
    assert!(seen.iter().all(|s| s.output_gradient == loss_grad));
    assert_eq!(net.out_bufs()[2], tensor!([[3.0, 3.0]]));
}

#[test]
fn backprop_accumulates_instead_of_overwriting() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut net = Network::new(vec![Box::new(Recorder::new(0, 2, &log))], Box::new(SquaredError::new(2)));
    let p = DataPoint::sample(vec![0.0, 0.0], vec![0]);
    net.backprop(&p);
    net.backprop(&p);
    assert_eq!(net.gradient(0).data, vec![2.0, 2.0]);
    net.zero_grad();
    assert_eq!(net.gradient(0).data, vec![0.0, 0.0]);
}

#[test]
fn batch_gradient_is_sum_of_single_sample_gradients() {
    init_logging();
    let data = points();

    let mut net = linear();
    net.zero_grad();
    for p in &data {
        net.backprop(p);
    }

    // hand-computed: outputs [3.5, 0.5] and [0.5, -1.5], loss gradients [5, 1] and [1, -5]
    assert_eq!(*net.gradient(0), tensor!([[7.0, 4.0], [-9.0, 6.0]]));
    assert_eq!(*net.gradient(1), tensor!([6.0, -4.0]));

    let mut expected = vec![vec![0.0; 4], vec![0.0; 2]];
    for p in &data {
        let mut single = linear();
        single.backprop(p);
        for (acc, g) in expected.iter_mut().zip(single.gradients()) {
            for (a, v) in acc.iter_mut().zip(&g.data) {
                *a += v;
            }
        }
    }
    assert_eq!(net.gradient(0).data, expected[0]);
    assert_eq!(net.gradient(1).data, expected[1]);
}

#[test]
fn step_without_regularization_uses_mean_gradient() {
    let mut net = linear();
    net.gradient_descent_step(0.5, 0.0, &points());

    assert_eq!(*net.gradient(0), tensor!([[3.5, 2.0], [-4.5, 3.0]]));
    assert_eq!(*net.gradient(1), tensor!([3.0, -2.0]));
    assert_eq!(*net.weight(0), tensor!([[-0.75, 1.0], [2.25, -0.5]]));
    assert_eq!(*net.weight(1), tensor!([-1.0, 0.5]));
}

#[test]
fn step_with_regularization_adds_weight_decay() {
    let mut net = linear();
    net.gradient_descent_step(0.5, 0.25, &points());

    // mean gradient + 2 * 0.25 * w
    assert_eq!(*net.gradient(0), tensor!([[4.0, 3.0], [-4.5, 3.5]]));
    assert_eq!(*net.gradient(1), tensor!([3.25, -2.25]));
    assert_eq!(*net.weight(0), tensor!([[-1.0, 0.5], [2.25, -0.75]]));
    assert_eq!(*net.weight(1), tensor!([-1.125, 0.625]));
}

#[test]
fn zero_learning_rate_leaves_weights_unchanged() {
    let mut net = linear();
    let before: Vec<Ten64> = net.weights().into_iter().cloned().collect();
    net.gradient_descent_step(0.0, 0.3, &points());
    let after: Vec<Ten64> = net.weights().into_iter().cloned().collect();
    assert_eq!(before, after);
}

#[test]
fn ranged_step_matches_slice_step() {
    let mut data = points();
    data.insert(0, DataPoint::sample(vec![9.0, 9.0], vec![0]));
    data.push(DataPoint::sample(vec![-9.0, 3.0], vec![1]));

    let mut sliced = linear();
    sliced.gradient_descent_step(0.1, 0.05, &data[1..3]);
    let mut ranged = linear();
    ranged.gradient_descent_step_range(0.1, 0.05, &data, 1..3);

    assert_eq!(sliced.weights(), ranged.weights());
    assert_eq!(sliced.gradients(), ranged.gradients());
}

#[test]
fn empty_batch_zeroes_gradients_and_keeps_weights() {
    let mut net = linear();
    net.backprop(&points()[0]);
    assert!(net.gradient(0).data.iter().any(|&g| g != 0.0));

    net.gradient_descent_step(1.0, 1.0, &[]);
    assert_eq!(*net.weight(0), tensor!([[1.0, 2.0], [0.0, 1.0]]));
    assert_eq!(*net.weight(1), tensor!([0.5, -0.5]));
    assert!(net.gradients().iter().all(|g| g.data.iter().all(|&v| v == 0.0)));

    let data = points();
    net.backprop(&data[1]);
    net.gradient_descent_step_range(1.0, 0.0, &data, 1..1);
    assert!(net.gradients().iter().all(|g| g.data.iter().all(|&v| v == 0.0)));
}

#[test]
fn describe_lists_chain_then_loss() {
    assert_eq!(linear().describe(), "Dense(2 -> 2)\nSquaredError(2)");
}
