//! Дерево решений (регрессия, CART)

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{EnergyError, Result};
use crate::models::{Regressor, TrainingBudget};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// None - дерево растет до чистых листьев
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Случайное подмножество признаков в каждом узле (None - все)
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }
}

/// Узлы хранятся плоским списком, дети - индексы в нем; корень - nodes[0]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    params: TreeParams,
    n_features: usize,
    nodes: Vec<TreeNode>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl RegressionTree {
    pub fn new(params: TreeParams) -> Self {
        Self {
            params,
            n_features: 0,
            nodes: Vec::new(),
        }
    }

    pub fn params(&self) -> &TreeParams {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Глубина обученного дерева
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0;
        let mut pending = vec![(0usize, 0usize)];
        while let Some((id, depth)) = pending.pop() {
            max_depth = max_depth.max(depth);
            if let TreeNode::Split { left, right, .. } = self.nodes[id] {
                pending.push((left, depth + 1));
                pending.push((right, depth + 1));
            }
        }
        max_depth
    }

    /// Обучение на подмножестве строк (bootstrap в лесу)
    pub fn fit_rows(&mut self, X: &Array2<f64>, y: &Array1<f64>, indices: Vec<usize>) -> Result<()> {
        if indices.is_empty() || X.ncols() == 0 {
            return Err(EnergyError::EmptyDataset("cannot fit tree".to_string()));
        }
        if X.nrows() != y.len() {
            return Err(EnergyError::InvalidParameter(format!(
                "X has {} rows but y has {}",
                X.nrows(),
                y.len()
            )));
        }
        if self.params.min_samples_split < 2 || self.params.min_samples_leaf == 0 {
            return Err(EnergyError::InvalidParameter(
                "min_samples_split must be >= 2 and min_samples_leaf >= 1".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        self.n_features = X.ncols();
        self.nodes = self.build_tree(X, y, indices, &mut rng);
        Ok(())
    }

    /// Построение в глубину (левое поддерево первым) с явным стеком
    fn build_tree(
        &self,
        X: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        rng: &mut StdRng,
    ) -> Vec<TreeNode> {
        let mut nodes = vec![TreeNode::Leaf { value: 0.0 }];
        let mut pending = vec![(0usize, 0usize, indices)];

        while let Some((id, depth, indices)) = pending.pop() {
            let n = indices.len();
            let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n as f64;
            let depth_reached = self.params.max_depth.map_or(false, |d| depth >= d);
            let pure = indices.iter().all(|&i| (y[i] - mean).abs() < 1e-12);

            if depth_reached || n < self.params.min_samples_split || pure {
                nodes[id] = TreeNode::Leaf { value: mean };
                continue;
            }

            let Some(best) = self.find_best_split(X, y, &indices, rng) else {
                // Не удалось найти разделение
                nodes[id] = TreeNode::Leaf { value: mean };
                continue;
            };

            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .into_iter()
                .partition(|&i| X[[i, best.feature]] <= best.threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(TreeNode::Leaf { value: 0.0 });
            nodes.push(TreeNode::Leaf { value: 0.0 });
            nodes[id] = TreeNode::Split {
                feature: best.feature,
                threshold: best.threshold,
                left,
                right,
            };
            pending.push((right, depth + 1, right_indices));
            pending.push((left, depth + 1, left_indices));
        }

        nodes
    }

    /// Перебор всех порогов с префиксными суммами; критерий - сумма квадратов отклонений
    fn find_best_split(
        &self,
        X: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut StdRng,
    ) -> Option<BestSplit> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf;

        let features: Vec<usize> = match self.params.max_features {
            Some(k) if k < X.ncols() => {
                let mut sampled = rand::seq::index::sample(rng, X.ncols(), k.max(1)).into_vec();
                sampled.sort_unstable();
                sampled
            }
            _ => (0..X.ncols()).collect(),
        };

        let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let parent_score = total_sq - total_sum * total_sum / n as f64;

        let mut best: Option<BestSplit> = None;
        let mut order = indices.to_vec();

        for feature in features {
            order.sort_by(|&a, &b| X[[a, feature]].total_cmp(&X[[b, feature]]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 1..n {
                let prev = order[pos - 1];
                left_sum += y[prev];
                left_sq += y[prev] * y[prev];

                let lo = X[[prev, feature]];
                let hi = X[[order[pos], feature]];
                if pos < min_leaf || n - pos < min_leaf || hi - lo <= 1e-12 {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let n_left = pos as f64;
                let n_right = (n - pos) as f64;
                let score = (left_sq - left_sum * left_sum / n_left)
                    + (right_sq - right_sum * right_sum / n_right);

                if best.as_ref().map_or(true, |b| score < b.score) {
                    best = Some(BestSplit {
                        feature,
                        threshold: lo + (hi - lo) / 2.0,
                        score,
                    });
                }
            }
        }

        best.filter(|b| b.score <= parent_score + 1e-9)
    }

    fn predict_row(&self, sample: ArrayView1<f64>) -> Result<f64> {
        if self.nodes.is_empty() {
            return Err(EnergyError::NotFitted("decision tree"));
        }
        let mut id = 0;
        loop {
            match self.nodes[id] {
                TreeNode::Leaf { value } => return Ok(value),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if sample[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    pub fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        if self.nodes.is_empty() {
            return Err(EnergyError::NotFitted("decision tree"));
        }
        if X.ncols() != self.n_features {
            return Err(EnergyError::InvalidParameter(format!(
                "tree expects {} features, got {}",
                self.n_features,
                X.ncols()
            )));
        }
        X.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }
}

impl Default for RegressionTree {
    fn default() -> Self {
        Self::new(TreeParams::default())
    }
}

impl Regressor for RegressionTree {
    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>, budget: &TrainingBudget) -> Result<()> {
        budget.check("Decision Tree")?;
        self.fit_rows(X, y, (0..X.nrows()).collect())?;
        budget.check("Decision Tree")
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        RegressionTree::predict(self, X)
    }
}
