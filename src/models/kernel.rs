//! Kernel Ridge Regression с RBF ядром

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{EnergyError, Result};
use crate::models::{Regressor, TrainingBudget};

const NAME: &str = "Kernel Ridge";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelRidge {
    alpha: f64,
    /// None - gamma = 1 / (n_features * Var(X))
    gamma: Option<f64>,
    /// Ограничение размера системы уравнений
    max_support: usize,
    seed: u64,
    fitted: Option<FittedKernel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedKernel {
    gamma: f64,
    y_mean: f64,
    support: Array2<f64>,
    dual_coef: Array1<f64>,
}

impl KernelRidge {
    pub fn new(alpha: f64, gamma: Option<f64>, max_support: usize, seed: u64) -> Self {
        Self {
            alpha,
            gamma,
            max_support,
            seed,
            fitted: None,
        }
    }

    pub fn n_support(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.support.nrows())
    }

    fn rbf(gamma: f64, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        let dist: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
        (-gamma * dist).exp()
    }

    /// Решение через метод Гаусса с выбором главного элемента
    fn solve_linear_system(A: Array2<f64>, b: Array1<f64>) -> Result<Array1<f64>> {
        let n = A.nrows();
        let mut augmented: Array2<f64> = Array2::zeros((n, n + 1));
        augmented.slice_mut(ndarray::s![.., ..n]).assign(&A);
        augmented.column_mut(n).assign(&b);

        // Прямой ход метода Гаусса
        for i in 0..n {
            // Поиск максимального элемента в столбце
            let mut max_row = i;
            let mut max_val = augmented[[i, i]].abs();
            for k in (i + 1)..n {
                if augmented[[k, i]].abs() > max_val {
                    max_val = augmented[[k, i]].abs();
                    max_row = k;
                }
            }

            // Перестановка строк
            if max_row != i {
                for j in 0..=n {
                    augmented.swap([i, j], [max_row, j]);
                }
            }

            let pivot = augmented[[i, i]];
            if pivot.abs() < 1e-12 {
                return Err(EnergyError::SingularMatrix);
            }

            for k in (i + 1)..n {
                let factor = augmented[[k, i]] / pivot;
                if factor == 0.0 {
                    continue;
                }
                for j in i..=n {
                    augmented[[k, j]] -= factor * augmented[[i, j]];
                }
            }
        }

        // Обратный ход
        let mut x: Array1<f64> = Array1::zeros(n);
        for i in (0..n).rev() {
            let mut sum = augmented[[i, n]];
            for j in (i + 1)..n {
                sum -= augmented[[i, j]] * x[j];
            }
            x[i] = sum / augmented[[i, i]];
        }

        Ok(x)
    }
}

impl Default for KernelRidge {
    fn default() -> Self {
        Self::new(1.0, None, 1000, 42)
    }
}

impl Regressor for KernelRidge {
    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>, budget: &TrainingBudget) -> Result<()> {
        if !(self.alpha > 0.0) || self.max_support == 0 {
            return Err(EnergyError::InvalidParameter(
                "alpha and max_support must be positive".to_string(),
            ));
        }
        if X.nrows() == 0 || X.ncols() == 0 {
            return Err(EnergyError::EmptyDataset("cannot fit kernel ridge".to_string()));
        }

        // Детерминированная подвыборка опорных строк
        let rows: Vec<usize> = if X.nrows() > self.max_support {
            let mut rng = StdRng::seed_from_u64(self.seed);
            let mut rows = rand::seq::index::sample(&mut rng, X.nrows(), self.max_support).into_vec();
            rows.sort_unstable();
            rows
        } else {
            (0..X.nrows()).collect()
        };
        let support = X.select(ndarray::Axis(0), &rows);
        let targets = y.select(ndarray::Axis(0), &rows);

        let gamma = match self.gamma {
            Some(g) if g > 0.0 => g,
            Some(g) => {
                return Err(EnergyError::InvalidParameter(format!(
                    "gamma must be positive, got {}",
                    g
                )))
            }
            None => {
                let mean = support.mean().unwrap_or(0.0);
                let var = support.mapv(|v| (v - mean).powi(2)).mean().unwrap_or(0.0);
                if var > 1e-12 {
                    1.0 / (support.ncols() as f64 * var)
                } else {
                    1.0
                }
            }
        };

        let y_mean = targets.mean().unwrap_or(0.0);
        let n = support.nrows();

        // (K + αI) a = y - mean
        let mut K: Array2<f64> = Array2::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let k = Self::rbf(gamma, support.row(i), support.row(j));
                K[[i, j]] = k;
                K[[j, i]] = k;
            }
            K[[i, i]] += self.alpha;
        }
        budget.check(NAME)?;

        let dual_coef = Self::solve_linear_system(K, targets.mapv(|v| v - y_mean))?;
        budget.check(NAME)?;

        self.fitted = Some(FittedKernel {
            gamma,
            y_mean,
            support,
            dual_coef,
        });
        Ok(())
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        let fitted = self.fitted.as_ref().ok_or(EnergyError::NotFitted("kernel ridge"))?;
        if X.ncols() != fitted.support.ncols() {
            return Err(EnergyError::InvalidParameter(format!(
                "kernel ridge expects {} features, got {}",
                fitted.support.ncols(),
                X.ncols()
            )));
        }

        Ok(X
            .rows()
            .into_iter()
            .map(|row| {
                fitted
                    .support
                    .rows()
                    .into_iter()
                    .zip(fitted.dual_coef.iter())
                    .map(|(s, c)| c * Self::rbf(fitted.gamma, row, s))
                    .sum::<f64>()
                    + fitted.y_mean
            })
            .collect())
    }
}
