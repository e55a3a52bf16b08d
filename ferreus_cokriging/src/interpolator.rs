/////////////////////////////////////////////////////////////////////////////////////////////
//
// Solves a potential field model once and serves evaluation, surfacing and persistence.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    assembler::{DualKrigingWeights, SystemLayout, assemble_system},
    config::Params,
    error::{KrigingError, KrigingResult, ModelIOError, ModelIOResult},
    evaluator::{evaluate_field_with_progress, evaluate_gradient_with_progress},
    grid::GridSet,
    interpolant_config::InterpolantSettings,
    linalg::solve_system,
    observations::ObservationSet,
    progress::{ProgressMsg, ProgressSink, fraction},
    surfacing::surface_nets,
};
use faer::Mat;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
    sync::Arc,
    time::Instant,
};
use tracing::{info, instrument};

/// Convenience builder for constructing a [`PotentialFieldInterpolator`].
///
/// The builder should be called via the [`PotentialFieldInterpolator::builder`] method.
pub struct PotentialFieldInterpolatorBuilder {
    observations: ObservationSet,
    settings: InterpolantSettings,
    params: Params,
    progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl PotentialFieldInterpolatorBuilder {
    fn new(observations: ObservationSet, settings: InterpolantSettings) -> Self {
        Self {
            observations,
            settings,
            params: Params::default(),
            progress_callback: None,
        }
    }

    /// Sets custom solver and evaluation parameters.
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Optional callback for reporting progress.
    ///
    /// Skipped during serialization.
    pub fn progress_callback(mut self, progress_callback: Arc<dyn ProgressSink>) -> Self {
        self.progress_callback = Some(progress_callback);
        self
    }

    /// Assembles and solves the co-kriging system.
    ///
    /// ### Errors
    /// Any error raised by [`assemble_system`] or [`crate::solve_system`].
    pub fn build(self) -> KrigingResult<PotentialFieldInterpolator> {
        PotentialFieldInterpolator::new(
            self.observations,
            self.settings,
            self.params,
            self.progress_callback,
        )
    }
}

/// A solved universal co-kriging model of a geological potential field.
///
/// The system is assembled and solved once when the interpolator is built. The
/// dual weights are then reused for every evaluation.
///
/// ### Example
/// ```
/// use faer::mat;
/// use ferreus_cokriging::{
///     GridSet, KernelParams, ObservationSet, PotentialFieldInterpolator,
///     interpolant_config::{InterpolantSettings, UniversalityDegree},
/// };
///
/// let layers = vec![
///     mat![[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [0.0, 4.0, 0.0f64]],
///     mat![[0.0, 0.0, 2.0], [4.0, 0.0, 2.0], [4.0, 4.0, 2.0f64]],
/// ];
/// let observations = ObservationSet::from_layers(
///     mat![[2.0, 2.0, 1.0f64]],
///     vec![0.0],
///     vec![0.0],
///     vec![1.0],
///     &layers,
/// )?;
///
/// let kernel_params = KernelParams::builder().range(10.0).build()?;
/// let settings = InterpolantSettings::builder(kernel_params)
///     .universality_degree(UniversalityDegree::One)
///     .build();
///
/// let model = PotentialFieldInterpolator::builder(observations, settings).build()?;
///
/// let levels = model.layer_potentials()?;
/// assert!(levels[1] > levels[0]);
///
/// let grid = GridSet::new(mat![[2.0, 2.0, 1.0f64]])?;
/// let values = model.evaluate(&grid)?;
/// assert!(values[(0, 0)] > levels[0] && values[(0, 0)] < levels[1]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Serialize, Deserialize, Debug)]
pub struct PotentialFieldInterpolator {
    /// Observations the model was solved for.
    observations: ObservationSet,

    /// Kernel and drift settings.
    settings: InterpolantSettings,

    /// Solver and evaluation parameters.
    pub params: Params,

    /// Solved dual kriging weights.
    weights: DualKrigingWeights,

    layout: SystemLayout,

    /// Normwise backward error of the accepted solve.
    backward_error: f64,

    /// Optional callback for reporting progress.
    /// Skipped during serialization.
    #[serde(skip, default)]
    pub(crate) progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl PotentialFieldInterpolator {
    /// Creates a new [`PotentialFieldInterpolatorBuilder`] for the given observations
    /// and settings.
    ///
    /// This is the way to construct an interpolator.
    pub fn builder(
        observations: ObservationSet,
        settings: InterpolantSettings,
    ) -> PotentialFieldInterpolatorBuilder {
        PotentialFieldInterpolatorBuilder::new(observations, settings)
    }

    #[instrument(skip_all, fields(n_dips = observations.n_dips(), n_pairs = observations.n_pairs()))]
    fn new(
        observations: ObservationSet,
        settings: InterpolantSettings,
        params: Params,
        progress_callback: Option<Arc<dyn ProgressSink>>,
    ) -> KrigingResult<Self> {
        let solver_start = Instant::now();

        let system = assemble_system(
            &observations,
            &settings.kernel_params,
            settings.universality_degree,
        )?;
        let layout = system.layout;

        if let Some(sink) = &progress_callback {
            sink.emit(ProgressMsg::SystemAssembled {
                size: layout.length_of_c,
                num_gradients: layout.length_of_cg,
                num_interfaces: layout.length_of_cgi,
                num_drift: layout.length_of_u_i,
            });
        }

        let report = solve_system(&system, &params)?;
        let weights = DualKrigingWeights::from_solution(report.solution.as_ref(), &layout)?;

        if let Some(sink) = &progress_callback {
            sink.emit(ProgressMsg::SystemSolved {
                backward_error: report.backward_error,
            });
        }

        info!(
            size = layout.length_of_c,
            factorisation = ?report.factorisation,
            backward_error = report.backward_error,
            elapsed = ?solver_start.elapsed(),
            "solved potential field"
        );

        Ok(Self {
            observations,
            settings,
            params,
            weights,
            layout,
            backward_error: report.backward_error,
            progress_callback,
        })
    }

    pub fn observations(&self) -> &ObservationSet {
        &self.observations
    }

    pub fn settings(&self) -> &InterpolantSettings {
        &self.settings
    }

    pub fn weights(&self) -> &DualKrigingWeights {
        &self.weights
    }

    pub fn layout(&self) -> &SystemLayout {
        &self.layout
    }

    /// Normwise backward error of the solve that produced the weights.
    pub fn backward_error(&self) -> f64 {
        self.backward_error
    }

    /// Potential at every grid point, as an `n_points × 1` column.
    ///
    /// ### Errors
    /// [`KrigingError::Shape`] if the grid dimensionality does not match the
    /// observations.
    pub fn evaluate(&self, grid: &GridSet) -> KrigingResult<Mat<f64>> {
        evaluate_field_with_progress(
            &self.weights,
            &self.observations,
            grid,
            &self.settings.kernel_params,
            self.settings.universality_degree,
            &self.params,
            self.progress_callback.as_deref(),
        )
    }

    /// Gradient of the potential at every grid point (`n_points × n_dims`).
    ///
    /// At an orientation location this reproduces the observed gradient minus
    /// `nugget_effect` times the orientation weight.
    pub fn evaluate_gradient(&self, grid: &GridSet) -> KrigingResult<Mat<f64>> {
        evaluate_gradient_with_progress(
            &self.weights,
            &self.observations,
            grid,
            &self.settings.kernel_params,
            self.settings.universality_degree,
            &self.params,
            self.progress_callback.as_deref(),
        )
    }

    /// Potential at the reference point of every interface pair (`n_pairs × 1`).
    pub fn interface_potentials(&self) -> KrigingResult<Mat<f64>> {
        let grid = GridSet::new(self.observations.ref_layer_points().to_owned())?;
        self.evaluate(&grid)
    }

    /// Potential of every layer, in order of first appearance.
    ///
    /// Pairs of the same layer share a reference point, so each layer has a single
    /// potential. These are the isovalues of the layer boundaries.
    pub fn layer_potentials(&self) -> KrigingResult<Vec<f64>> {
        let potentials = self.interface_potentials()?;
        let layers = self.observations.pair_layers();

        let mut levels = Vec::new();
        for (pair, &layer) in layers.iter().enumerate() {
            if layer == levels.len() {
                levels.push(potentials[(pair, 0)]);
            }
        }
        Ok(levels)
    }

    /// Extracts isosurfaces of the potential field with dense Surface Nets.
    ///
    /// The field is evaluated once on a regular grid over `extent`
    /// (`[minx, miny, minz, maxx, maxy, maxz]`) with node `spacing`, then each
    /// isovalue is extracted from the sampled values.
    ///
    /// ### Returns
    /// `(points_per_iso, faces_per_iso)` where `points_per_iso[i]` is a `(V_i × 3)`
    /// matrix of vertex positions and `faces_per_iso[i]` an `(F_i × 3)` matrix of
    /// 0-based triangle indices. An isovalue that does not cross the grid gives an
    /// empty mesh.
    ///
    /// ### Errors
    /// [`KrigingError::Shape`] for 2D models and [`KrigingError::Configuration`] for
    /// an invalid extent or spacing.
    pub fn build_isosurfaces(
        &self,
        extent: &[f64],
        spacing: f64,
        isovalues: &[f64],
    ) -> KrigingResult<(Vec<Mat<f64>>, Vec<Mat<usize>>)> {
        if self.observations.n_dims() != 3 {
            return Err(KrigingError::Shape(
                "isosurfaces are only available for 3D models".to_string(),
            ));
        }
        if !(spacing > 0.0) {
            return Err(KrigingError::Configuration(format!(
                "isosurface spacing must be positive, got {spacing}"
            )));
        }

        let grid = GridSet::regular().extent(extent).spacing(spacing).build()?;
        let resolution = grid.resolution().map(<[usize]>::to_vec).unwrap_or_default();
        let values = self.evaluate(&grid)?;

        let mut all_points = Vec::with_capacity(isovalues.len());
        let mut all_faces = Vec::with_capacity(isovalues.len());

        for (i, &isovalue) in isovalues.iter().enumerate() {
            let (points, faces) = surface_nets(values.as_ref(), extent, &resolution, isovalue)?;
            info!(isovalue, num_faces = faces.nrows(), "extracted isosurface");

            if let Some(sink) = &self.progress_callback {
                sink.emit(ProgressMsg::SurfacingProgress {
                    isovalue,
                    progress: fraction(i + 1, isovalues.len()),
                });
            }

            all_points.push(points);
            all_faces.push(faces);
        }

        Ok((all_points, all_faces))
    }

    /// Save this interpolator to a **JSON envelope** `{ format, version, model }`.
    ///
    /// ### Errors
    /// - Returns `ModelIOError::{Create, Serialize, Flush}` on I/O or serialization
    ///   failures.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> ModelIOResult<()> {
        let path_ref = path.as_ref();
        let file = File::create(path_ref).map_err(|e| ModelIOError::Create {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        let mut w = BufWriter::new(file);

        let env = JsonEnvelopeRef {
            format: JSON_FORMAT_NAME,
            version: JSON_VERSION,
            model: self,
        };

        serde_json::to_writer_pretty(&mut w, &env).map_err(|e| ModelIOError::Serialize {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        w.flush().map_err(|e| ModelIOError::Flush {
            path: path_ref.to_path_buf(),
            source: e,
        })
    }

    /// Load an interpolator from a versioned **JSON envelope**, validating format & version.
    ///
    /// If `progress` is `Some`, the sink is installed on the returned model.
    ///
    /// ### Errors
    /// - Returns `ModelIOError::{Open, Parse, FormatMismatch, VersionMismatch}` as appropriate.
    pub fn load_model<P: AsRef<Path>>(
        path: P,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> ModelIOResult<Self> {
        let path_ref = path.as_ref();

        let file = File::open(path_ref).map_err(|e| ModelIOError::Open {
            path: path_ref.to_path_buf(),
            source: e,
        })?;

        let env: JsonEnvelopeOwned<Self> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| ModelIOError::Parse {
                path: path_ref.to_path_buf(),
                source: e,
            })?;

        if env.format != JSON_FORMAT_NAME {
            return Err(ModelIOError::FormatMismatch {
                path: path_ref.to_path_buf(),
                found: env.format,
                expected: JSON_FORMAT_NAME,
            });
        }
        if env.version != JSON_VERSION {
            return Err(ModelIOError::VersionMismatch {
                path: path_ref.to_path_buf(),
                found: env.version,
                expected: JSON_VERSION,
            });
        }

        let mut model = env.model;
        model.progress_callback = progress;
        Ok(model)
    }
}

const JSON_FORMAT_NAME: &str = "ferreus_cokriging.json";
const JSON_VERSION: u32 = 1;

/// Borrowing envelope for SAVE (no clone of the model).
#[derive(Serialize)]
struct JsonEnvelopeRef<'a, T: ?Sized> {
    format: &'static str,
    version: u32,
    #[serde(flatten)]
    model: &'a T,
}

/// Owning envelope for LOAD.
#[derive(Deserialize)]
struct JsonEnvelopeOwned<T> {
    format: String,
    version: u32,
    #[serde(flatten)]
    model: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{interpolant_config::UniversalityDegree, progress::closure_sink};
    use equator::assert;
    use faer::mat;
    use ferreus_cokriging_utils::KernelParams;
    use std::sync::Mutex;

    fn layered_observations() -> ObservationSet {
        let layers = vec![
            mat![
                [0.0, 0.0, 0.0],
                [6.0, 0.0, 0.1],
                [0.0, 6.0, -0.1],
                [6.0, 6.0, 0.0f64]
            ],
            mat![
                [0.0, 0.0, 3.0],
                [6.0, 0.0, 3.1],
                [0.0, 6.0, 2.9],
                [6.0, 6.0, 3.0f64]
            ],
        ];
        ObservationSet::from_layers(
            mat![[3.0, 3.0, 0.0], [3.0, 3.0, 3.0f64]],
            vec![2.0, 2.0],
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            &layers,
        )
        .unwrap()
    }

    fn settings(degree: UniversalityDegree) -> InterpolantSettings {
        let kernel_params = KernelParams::builder().range(15.0).build().unwrap();
        InterpolantSettings::builder(kernel_params)
            .universality_degree(degree)
            .build()
    }

    fn scratch(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("ferreus_cokriging_{name}_{}.json", std::process::id()))
    }

    #[test]
    fn layer_potentials_order_with_stratigraphy() {
        let model = PotentialFieldInterpolator::builder(
            layered_observations(),
            settings(UniversalityDegree::One),
        )
        .build()
        .unwrap();

        let levels = model.layer_potentials().unwrap();
        assert!(levels.len() == 2);
        assert!(levels[1] > levels[0]);
        assert!(model.backward_error() <= model.params.residual_tolerance);
    }

    #[test]
    fn interface_points_share_their_layer_potential() {
        let model = PotentialFieldInterpolator::builder(
            layered_observations(),
            settings(UniversalityDegree::Two),
        )
        .build()
        .unwrap();

        let rest = GridSet::new(model.observations().rest_layer_points().to_owned()).unwrap();
        let at_rest = model.evaluate(&rest).unwrap();
        let at_ref = model.interface_potentials().unwrap();

        for i in 0..at_ref.nrows() {
            assert!((at_rest[(i, 0)] - at_ref[(i, 0)]).abs() < 1e-8);
        }
    }

    #[test]
    fn progress_reports_assembly_and_solve() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&received);
        let (sink, handle) = closure_sink(64, move |msg| {
            let tag = match msg {
                ProgressMsg::SystemAssembled { size, .. } => format!("assembled {size}"),
                ProgressMsg::SystemSolved { .. } => "solved".to_string(),
                _ => return,
            };
            store.lock().unwrap().push(tag);
        });

        let model = PotentialFieldInterpolator::builder(
            layered_observations(),
            settings(UniversalityDegree::One),
        )
        .progress_callback(sink)
        .build()
        .unwrap();
        let size = model.layout().length_of_c;
        drop(model);
        handle.join().unwrap();

        let messages = received.lock().unwrap().clone();
        assert!(messages == vec![format!("assembled {size}"), "solved".to_string()]);
    }

    #[test]
    fn isosurfaces_follow_layer_boundaries() {
        let model = PotentialFieldInterpolator::builder(
            layered_observations(),
            settings(UniversalityDegree::One),
        )
        .build()
        .unwrap();
        let levels = model.layer_potentials().unwrap();

        let extent = [0.0, 0.0, -1.0, 6.0, 6.0, 4.0];
        let (points, faces) = model.build_isosurfaces(&extent, 0.5, &levels).unwrap();

        assert!(points.len() == 2);
        for (layer, (p, f)) in points.iter().zip(&faces).enumerate() {
            assert!(f.nrows() > 0);
            let mean_z = p.col(2).sum() / p.nrows() as f64;
            let expected = 3.0 * layer as f64;
            assert!((mean_z - expected).abs() < 0.5);
        }
    }

    #[test]
    fn two_dimensional_models_cannot_be_surfaced() {
        let layers = vec![
            mat![[0.0, 0.0], [4.0, 0.0f64]],
            mat![[0.0, 2.0], [4.0, 2.0f64]],
        ];
        let obs = ObservationSet::from_layers(
            mat![[2.0, 1.0f64]],
            vec![90.0],
            vec![0.0],
            vec![1.0],
            &layers,
        )
        .unwrap();
        let model = PotentialFieldInterpolator::builder(obs, settings(UniversalityDegree::One))
            .build()
            .unwrap();

        let err = model
            .build_isosurfaces(&[0.0, 0.0, 4.0, 2.0], 0.5, &[0.0])
            .unwrap_err();
        assert!(matches!(err, KrigingError::Shape(_)));
    }

    #[test]
    fn saved_model_reloads_with_identical_weights() {
        let model = PotentialFieldInterpolator::builder(
            layered_observations(),
            settings(UniversalityDegree::One),
        )
        .build()
        .unwrap();

        let path = scratch("model");
        model.save_model(&path).unwrap();
        let loaded = PotentialFieldInterpolator::load_model(&path, None).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(loaded.weights() == model.weights());
        assert!(loaded.layout() == model.layout());
        assert!(loaded.settings() == model.settings());

        let grid = GridSet::new(mat![[1.0, 2.0, 1.5], [5.0, 4.0, 2.5f64]]).unwrap();
        assert!(loaded.evaluate(&grid).unwrap() == model.evaluate(&grid).unwrap());
    }

    #[test]
    fn loading_rejects_foreign_formats() {
        let model = PotentialFieldInterpolator::builder(
            layered_observations(),
            settings(UniversalityDegree::Zero),
        )
        .build()
        .unwrap();

        let path = scratch("foreign");
        model.save_model(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replace(JSON_FORMAT_NAME, "other_model.json")).unwrap();

        let err = PotentialFieldInterpolator::load_model(&path, None).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, ModelIOError::FormatMismatch { .. }));
    }
}
