//! Driver of the API conversion pass over a whole [`ClassGraph`].

use std::collections::BTreeMap;

use desugar_ir::{ClassGraph, ClassName, MethodRef, SyntheticKind};
use desugar_spec::{MachineSpecification, TypeRewriter};
use rayon::prelude::*;

use crate::context::{ClassResult, ConversionContext};
use crate::error::ConversionError;
use crate::options::ConversionOptions;
use crate::reporter::{Diagnostic, Reporter};

/// Outcome of [`ApiConversionPass::run`]. Every list is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub rewritten_methods: Vec<MethodRef>,
    pub callbacks: Vec<MethodRef>,
    pub synthesized_classes: BTreeMap<SyntheticKind, Vec<ClassName>>,
    pub tracked_conversions: Vec<MethodRef>,
    pub tracked_callbacks: Vec<MethodRef>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PassSummary {
    pub fn synthesized(&self, kind: SyntheticKind) -> &[ClassName] {
        self.synthesized_classes
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

pub struct ApiConversionPass<'a> {
    spec: &'a MachineSpecification,
    rewriter: &'a dyn TypeRewriter,
    options: ConversionOptions,
}

impl<'a> ApiConversionPass<'a> {
    pub fn new(
        spec: &'a MachineSpecification,
        rewriter: &'a dyn TypeRewriter,
        options: ConversionOptions,
    ) -> Self {
        Self {
            spec,
            rewriter,
            options,
        }
    }

    /// Checks the specification against `graph`, scans every program class,
    /// then applies rewritten code, callbacks and synthesized classes.
    pub fn run(&self, graph: &mut ClassGraph) -> Result<PassSummary, ConversionError> {
        let reporter = Reporter::new();
        let names = graph.program_class_names();
        let _span = tracing::info_span!(
            target: "desugar.apiconv",
            "api_conversion",
            classes = names.len(),
            mode = ?self.options.mode,
        )
        .entered();

        let diagnostics = self.spec.validate(graph);
        if !diagnostics.is_ok() {
            let message = diagnostics
                .errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ConversionError::inconsistency(message));
        }

        let (mut results, synthesized) = {
            let shared: &ClassGraph = graph;
            let context = ConversionContext::new(
                shared,
                self.spec,
                self.rewriter,
                &self.options,
                &reporter,
            );
            let pool = ScanPool::new(self.options.worker_threads);
            let results = pool.install(|| {
                names
                    .par_iter()
                    .filter_map(|name| shared.class(name.as_str()))
                    .map(|class| context.process_class(class))
                    .collect::<Result<Vec<ClassResult>, ConversionError>>()
            })?;
            (results, context.finish()?)
        };
        results.sort_by(|a, b| a.class.cmp(&b.class));

        let mut summary = PassSummary {
            tracked_conversions: synthesized.tracked_conversions,
            tracked_callbacks: synthesized.tracked_callbacks,
            ..PassSummary::default()
        };
        for result in results {
            for (method, code) in result.rewritten {
                if graph.replace_code(&method, code) {
                    summary.rewritten_methods.push(method);
                }
            }
            let callbacks: Vec<MethodRef> = result
                .callbacks
                .iter()
                .map(|callback| callback.method.clone())
                .collect();
            let added = graph.add_methods(result.class.as_str(), result.callbacks);
            if added != callbacks.len() {
                tracing::warn!(
                    target: "desugar.apiconv",
                    class = %result.class,
                    expected = callbacks.len(),
                    added,
                    "callback signature already declared"
                );
            }
            summary.callbacks.extend(callbacks);
        }
        for class in synthesized.classes {
            if let Some(kind) = class.synthetic {
                summary
                    .synthesized_classes
                    .entry(kind)
                    .or_default()
                    .push(class.name.clone());
            }
            let name = class.name.clone();
            if graph.add_class(class).is_some() {
                tracing::warn!(target: "desugar.apiconv", class = %name, "synthesized class replaced an existing definition");
            }
        }
        summary.rewritten_methods.sort();
        summary.callbacks.sort();
        summary.diagnostics = reporter.take();
        tracing::debug!(
            target: "desugar.apiconv",
            rewritten = summary.rewritten_methods.len(),
            callbacks = summary.callbacks.len(),
            synthesized = summary.synthesized_classes.values().map(Vec::len).sum::<usize>(),
            "api conversion finished"
        );
        Ok(summary)
    }
}

/// Worker pool used to scan classes.
enum ScanPool {
    /// Dedicated pool sized by `worker_threads`.
    Rayon(rayon::ThreadPool),
    /// Runs on Rayon's global pool, either because no size was configured or
    /// because the dedicated pool could not be created.
    Inline,
}

impl ScanPool {
    fn new(worker_threads: Option<usize>) -> Self {
        let Some(threads) = worker_threads else {
            return Self::Inline;
        };
        match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("desugar-apiconv-{idx}"))
            .build()
        {
            Ok(pool) => Self::Rayon(pool),
            Err(err) => {
                tracing::warn!(
                    target: "desugar.apiconv",
                    ?err,
                    threads,
                    "failed to create API conversion worker pool; falling back to Rayon's global pool"
                );
                Self::Inline
            }
        }
    }

    fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        match self {
            Self::Rayon(pool) => pool.install(op),
            Self::Inline => op(),
        }
    }
}
