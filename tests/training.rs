use hrd_trainer::ops::FitnessFunction;
use hrd_trainer::output::RecordingOutput;
use hrd_trainer::parallel::PipelineEvaluator;
use hrd_trainer::scoring::{ScoringOptions, ScoringPipeline};
use hrd_trainer::{
    CandidateHit, ConfigError, Corpus, DomainTable, Entity, GeneticTrainer, ParameterSet,
    ReferenceSet, TrainerSettings, TrainingError, WeightRange,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const SETTINGS: &str = r"
population_size: 10
generations: 6
rng_seed: 11
databases: [swissprot, trembl]
seed_parameters:
  token_score_bit_score_weight: 0.5
  token_score_database_score_weight: 0.2
  token_score_overlap_score_weight: 0.3
  domain_similarity_weight: 0.5
  databases:
    swissprot: { weight: 53.0, description_score_bit_score_weight: 0.3 }
    trembl: { weight: 21.0, description_score_bit_score_weight: 0.6 }
";

fn settings() -> TrainerSettings {
    TrainerSettings::from_yaml_str(SETTINGS).unwrap()
}

fn corpus() -> Corpus {
    let mut transporter = Entity::new("Q1", 300).with_domains(["IPR1"]);
    transporter.add_hit(
        "swissprot",
        CandidateHit::new("P1", "ABC transporter permease", 210.0)
            .with_alignment(1, 280, 1, 290, 300),
    );
    transporter.add_hit(
        "trembl",
        CandidateHit::new("T1", "Putative uncharacterized protein", 250.0),
    );

    let mut kinase = Entity::new("Q2", 150).with_domains(["IPR2"]);
    kinase.add_hit("swissprot", CandidateHit::new("P2", "Serine kinase", 90.0));
    kinase.add_hit("trembl", CandidateHit::new("T2", "Kinase domain protein", 120.0));

    let mut orphan = Entity::new("Q3", 80);
    orphan.add_hit("trembl", CandidateHit::new("T3", "Membrane lipoprotein", 40.0));

    [transporter, kinase, orphan].into_iter().collect()
}

fn domains() -> DomainTable {
    let mut table = DomainTable::new();
    table.insert_domain("IPR1", 2.0);
    table.insert_domain("IPR2", 1.5);
    table.annotate("P1", "IPR1");
    table.annotate("T2", "IPR2");
    table
}

fn references() -> ReferenceSet {
    let mut references = ReferenceSet::new();
    references.insert_description("Q1", "ABC transporter permease");
    references.insert_description("Q2", "Serine kinase");
    references.insert_description("Q3", "Lipoprotein");
    references
}

fn trainer(settings: TrainerSettings) -> GeneticTrainer<PipelineEvaluator> {
    GeneticTrainer::from_settings(
        settings,
        Arc::new(corpus()),
        Arc::new(domains()),
        Arc::new(references()),
    )
    .unwrap()
}

#[test]
fn best_score_never_decreases() {
    init_tracing();
    let mut trainer = trainer(settings());
    let mut rng = trainer.rng();
    let report = trainer.run(&mut rng).unwrap();

    assert_eq!(report.stats.generations(), 6);
    for pair in report.stats.best_score.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
    let best = report.best.score().unwrap();
    assert_eq!(report.stats.best_score.last().copied(), Some(best));
    assert!(best <= report.avg_max_evaluation_score + 1e-12);
    assert!((1..=6).contains(&report.generation_found));
}

#[test]
fn every_generation_is_reported() {
    init_tracing();
    let settings = settings();
    assert_eq!(settings.survivor_count(), 2);
    assert_eq!(settings.offspring_count(), 2);
    assert_eq!(settings.mutant_count(), 2);

    let mut recorder = RecordingOutput::default();
    let mut trainer = GeneticTrainer::builder(
        settings.clone(),
        PipelineEvaluator::new(pipeline(&settings), None).unwrap(),
    )
    .output(&mut recorder)
    .build()
    .unwrap();
    let mut rng = trainer.rng();
    trainer.run(&mut rng).unwrap();
    drop(trainer);

    assert_eq!(recorder.generations.len(), 6);
    for report in &recorder.generations {
        assert_eq!(report.population_size, settings.population_size);
    }
    for pair in recorder.generations.windows(2) {
        assert!(pair[1].best.score() >= pair[0].best.score());
        assert!(pair[1].score_delta.is_finite());
    }
}

fn pipeline(settings: &TrainerSettings) -> ScoringPipeline {
    ScoringPipeline::new(
        Arc::new(corpus()),
        Arc::new(domains()),
        Arc::new(references()),
        settings.scoring.clone(),
    )
}

#[test]
fn rescoring_a_clone_reproduces_its_fitness() {
    let settings = settings();
    let pipeline = pipeline(&settings);
    let space = settings.parameter_space().unwrap();
    let mut set = ParameterSet::seed(settings.seed_parameters.clone(), &space);
    set.set_fitness(pipeline.evaluate(set.weights()).unwrap());

    let copy = set.clone_unscored();
    assert!(copy.score().is_none());
    let rescored = pipeline.evaluate(copy.weights()).unwrap();
    assert_eq!(Some(&rescored), set.fitness());
}

#[test]
fn parallel_training_matches_sequential() {
    init_tracing();
    let sequential = trainer(settings());
    let mut parallel_settings = settings();
    parallel_settings.max_concurrency = Some(3);
    let parallel = trainer(parallel_settings);

    let mut runs = Vec::new();
    for mut trainer in [sequential, parallel] {
        let mut rng = trainer.rng();
        runs.push(trainer.run(&mut rng).unwrap());
    }
    assert_eq!(runs[0].best, runs[1].best);
    assert_eq!(runs[0].stats, runs[1].stats);
    assert_eq!(runs[0].generation_found, runs[1].generation_found);
}

#[test]
fn settings_survive_a_yaml_round_trip() {
    let settings = settings();
    let document = serde_yaml::to_string(&settings).unwrap();
    let parsed = TrainerSettings::from_yaml_str(&document).unwrap();
    assert_eq!(parsed, settings);
}

#[test]
fn missing_reference_aborts_training() {
    init_tracing();
    let mut corpus = corpus();
    corpus.push(Entity::new("Q4", 60));

    let result = GeneticTrainer::from_settings(
        settings(),
        Arc::new(corpus),
        Arc::new(domains()),
        Arc::new(references()),
    );
    assert!(matches!(
        result,
        Err(TrainingError::MissingReference { entity }) if entity == "Q4"
    ));
}

#[test]
fn ontology_evaluation_requires_reference_terms() {
    let mut settings = settings();
    settings.scoring = ScoringOptions {
        evaluate_ontology: true,
        ..ScoringOptions::default()
    };
    let pipeline = pipeline(&settings);
    let err = pipeline.evaluate(&settings.seed_parameters).unwrap_err();
    assert!(matches!(err, TrainingError::MissingReferenceAnnotations { .. }));
}

#[test]
fn entity_without_domains_has_zero_similarity() {
    let settings = settings();
    let pipeline = pipeline(&settings);
    let mut context = hrd_trainer::scoring::EvaluationContext::new();
    let orphan = &pipeline.corpus().entities()[2];
    let selected = pipeline
        .score_entity(orphan, &settings.seed_parameters, &mut context)
        .unwrap();

    assert_eq!(selected, Some(0));
    assert!(context.domain_scores().basis.is_empty());
    assert_eq!(context.domain_scores().similarities, vec![0.0]);
}

#[test]
fn assignments_name_the_selected_hit() {
    let settings = settings();
    let pipeline = pipeline(&settings);
    let assignments = pipeline
        .assign_descriptions(&settings.seed_parameters)
        .unwrap();
    assert_eq!(assignments.len(), 3);
    assert_eq!(assignments[2].entity, "Q3");
    assert_eq!(assignments[2].accession, "T3");
    assert_eq!(assignments[2].database, "trembl");
}

#[test]
fn trained_weights_seed_a_new_run_with_the_same_score() {
    init_tracing();
    let mut trainer = trainer(settings());
    let mut rng = trainer.rng();
    let report = trainer.run(&mut rng).unwrap();

    let mut settings = settings();
    settings.seed_parameters = report.best.weights().clone();
    let document = serde_yaml::to_string(&settings).unwrap();
    let reloaded = TrainerSettings::from_yaml_str(&document).unwrap();
    reloaded.validate().unwrap();

    let space = reloaded.parameter_space().unwrap();
    let seed = ParameterSet::seed(reloaded.seed_parameters.clone(), &space);
    assert_eq!(seed.weights(), report.best.weights());
    let rescored = pipeline(&reloaded).evaluate(seed.weights()).unwrap();
    assert_eq!(Some(rescored.avg_evaluation_score), report.best.score());
}

#[test]
fn narrow_token_bounds_hold_for_the_best_set() {
    init_tracing();
    let mut settings = settings();
    settings.bounds.token_score_weight = WeightRange::new(0.3, 0.4);
    settings.seed_parameters.token_score_bit_score_weight = 0.4;
    settings.seed_parameters.token_score_database_score_weight = 0.3;
    settings.seed_parameters.token_score_overlap_score_weight = 0.3;
    let mut trainer = trainer(settings);
    let mut rng = trainer.rng();
    let report = trainer.run(&mut rng).unwrap();

    let weights = report.best.weights();
    let tokens = [
        weights.token_score_bit_score_weight,
        weights.token_score_database_score_weight,
        weights.token_score_overlap_score_weight,
    ];
    for value in tokens {
        assert!((0.3..=0.4).contains(&value), "token weight {value} left its bounds");
    }
    assert!((tokens.iter().sum::<f64>() - 1.0).abs() < 1e-9);
}

#[test]
fn infeasible_token_bounds_fail_validation() {
    let mut settings = settings();
    settings.bounds.token_score_weight = WeightRange::new(0.4, 1.0);
    assert!(matches!(
        settings.validate(),
        Err(ConfigError::InfeasibleTokenRange { .. })
    ));
}

#[test]
fn blacklisted_reference_does_not_abort_training() {
    init_tracing();
    let mut references = references();
    references.insert_description("Q3", "Uncharacterized protein");
    let mut trainer = GeneticTrainer::from_settings(
        settings(),
        Arc::new(corpus()),
        Arc::new(domains()),
        Arc::new(references),
    )
    .unwrap();
    let mut rng = trainer.rng();
    let report = trainer.run(&mut rng).unwrap();
    assert!(report.best.score().unwrap() <= 2.0 / 3.0 + 1e-12);
}
