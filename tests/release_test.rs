use delorean::commands::app::{AppError, run_channels};
use delorean::commands::release::{ReleaseContext, ReleaseError, release};
use delorean::config::Settings;
use delorean::domain::{
    CommitAuthor, Credentials, MergeRequest, MergeRequestDraft, PackageIndex, Project,
    ReleaseChannel, ReleaseTarget, ReleaseVersion, ReviewError, ReviewPlatform, VcsError,
    WorkingCopy,
};
use delorean::infrastructure::CatalogError;
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const INDEX: &str = "\
packageName: integreatly
channels:
- name: rhmi
  currentCSV: integreatly-operator.v2.0.0
";

/// Working copy that records every call instead of running git
struct FakeCatalog {
    branch: RefCell<String>,
    calls: RefCell<Vec<String>>,
    dirty: Vec<String>,
    fail_on: Option<&'static str>,
}

impl FakeCatalog {
    fn on(branch: &str) -> Self {
        Self {
            branch: RefCell::new(branch.to_owned()),
            calls: RefCell::new(Vec::new()),
            dirty: Vec::new(),
            fail_on: None,
        }
    }

    fn record(&self, operation: &'static str, call: String) -> Result<(), VcsError> {
        self.calls.borrow_mut().push(call);
        if self.fail_on == Some(operation) {
            return Err(VcsError::OperationFailed {
                operation,
                reason: "simulated failure".into(),
            });
        }
        Ok(())
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl WorkingCopy for FakeCatalog {
    fn current_branch(&self) -> Result<String, VcsError> {
        self.record("rev-parse", "current_branch".into())?;
        Ok(self.branch.borrow().clone())
    }

    fn create_and_checkout_branch(&self, branch: &str) -> Result<(), VcsError> {
        self.record("checkout -b", format!("checkout -b {branch}"))?;
        *self.branch.borrow_mut() = branch.to_owned();
        Ok(())
    }

    fn checkout_branch(&self, branch: &str) -> Result<(), VcsError> {
        self.record("checkout", format!("checkout {branch}"))?;
        *self.branch.borrow_mut() = branch.to_owned();
        Ok(())
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<(), VcsError> {
        let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        self.record("add", format!("add {}", paths.join(" ")))
    }

    fn commit(&self, message: &str, author: &CommitAuthor) -> Result<(), VcsError> {
        self.record("commit", format!("commit {message} by {author}"))
    }

    fn status(&self) -> Result<Vec<String>, VcsError> {
        self.record("status", "status".into())?;
        Ok(self.dirty.clone())
    }

    fn push(
        &self,
        remote: &str,
        branch: &str,
        credentials: &Credentials,
    ) -> Result<(), VcsError> {
        self.record(
            "push",
            format!("push {remote} {branch} as {}", credentials.username),
        )
    }
}

/// Review platform that hands out merge requests without any network
struct FakeReview {
    lookups: RefCell<Vec<String>>,
    drafts: RefCell<Vec<(String, MergeRequestDraft)>>,
    reject_branches_containing: Option<&'static str>,
}

impl FakeReview {
    fn new() -> Self {
        Self {
            lookups: RefCell::new(Vec::new()),
            drafts: RefCell::new(Vec::new()),
            reject_branches_containing: None,
        }
    }
}

impl ReviewPlatform for FakeReview {
    fn find_project(&self, path: &str) -> Result<Project, ReviewError> {
        self.lookups.borrow_mut().push(path.to_owned());
        Ok(Project {
            id: 42,
            path: path.to_owned(),
            web_url: format!("https://gitlab.example.com/{path}"),
        })
    }

    fn create_merge_request(
        &self,
        source_project: &str,
        draft: &MergeRequestDraft,
    ) -> Result<MergeRequest, ReviewError> {
        if let Some(needle) = self.reject_branches_containing
            && draft.source_branch.contains(needle)
        {
            return Err(ReviewError::MergeRequestFailed {
                source_branch: draft.source_branch.clone(),
                reason: "409 Conflict".into(),
            });
        }

        let mut drafts = self.drafts.borrow_mut();
        drafts.push((source_project.to_owned(), draft.clone()));
        let iid = u64::try_from(drafts.len()).unwrap();
        Ok(MergeRequest {
            iid,
            web_url: format!("https://gitlab.example.com/service/managed-tenants/-/merge_requests/{iid}"),
        })
    }
}

/// Both working trees of a release run, laid out like the real repositories
struct Workspace {
    operator: TempDir,
    catalog: TempDir,
    settings: Settings,
}

impl Workspace {
    fn new(version: &str) -> Self {
        let operator = TempDir::new().unwrap();
        let manifests = operator.path().join(format!(
            "deploy/olm-catalog/integreatly-operator/integreatly-operator-{version}"
        ));
        fs::create_dir_all(&manifests).unwrap();
        fs::write(
            manifests.join("integreatly-operator.clusterserviceversion.yaml"),
            "kind: ClusterServiceVersion\n",
        )
        .unwrap();
        fs::write(
            manifests.join("integreatly.org_rhmis_crd.yaml"),
            "kind: CustomResourceDefinition\n",
        )
        .unwrap();

        let catalog = TempDir::new().unwrap();
        for directory in [
            "addons-stage/integreatly-operator/integreatly-operator.package.yaml",
            "addons-production/integreatly-operator-internal/integreatly-operator-internal.package.yaml",
            "addons-production/integreatly-operator/integreatly-operator.package.yaml",
        ] {
            let path = catalog.path().join(directory);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, INDEX).unwrap();
        }

        let mut settings = Settings::new("someone".into(), "s3cr3t".into());
        settings.merge_request_description = "release notes".into();

        Self {
            operator,
            catalog,
            settings,
        }
    }

    fn context(&self) -> ReleaseContext<'_> {
        ReleaseContext {
            operator_root: self.operator.path(),
            catalog_root: self.catalog.path(),
            settings: &self.settings,
        }
    }

    fn catalog_path(&self, relative: &str) -> PathBuf {
        self.catalog.path().join(relative)
    }

    fn current_csv(&self, index: &str) -> String {
        let content = fs::read_to_string(self.catalog_path(index)).unwrap();
        PackageIndex::parse(&content)
            .unwrap()
            .current_csv()
            .to_owned()
    }
}

fn version(value: &str) -> ReleaseVersion {
    value.parse().unwrap()
}

#[test]
fn pre_release_is_published_to_stage_only() {
    let workspace = Workspace::new("2.1.0-rc1");
    let catalog = FakeCatalog::on("master");
    let review = FakeReview::new();

    let merge_requests = run_channels(
        &workspace.context(),
        &catalog,
        &review,
        &version("2.1.0-rc1"),
    )
    .unwrap();

    assert_eq!(merge_requests.len(), 1);
    assert_eq!(
        catalog.calls(),
        vec![
            "current_branch",
            "checkout -b integreatly-operator-stage-v2.1.0-rc1",
            "add addons-stage/integreatly-operator/2.1.0-rc1/integreatly-operator.clusterserviceversion.yaml \
             addons-stage/integreatly-operator/2.1.0-rc1/integreatly.org_rhmis_crd.yaml",
            "add addons-stage/integreatly-operator/integreatly-operator.package.yaml",
            "commit update integreatly-operator stage to 2.1.0-rc1 by Delorean <cloud-services-delorean@redhat.com>",
            "status",
            "push fork integreatly-operator-stage-v2.1.0-rc1 as someone",
            "checkout master",
        ]
    );

    assert_eq!(
        fs::read_to_string(workspace.catalog_path(
            "addons-stage/integreatly-operator/2.1.0-rc1/integreatly-operator.clusterserviceversion.yaml"
        ))
        .unwrap(),
        "kind: ClusterServiceVersion\n"
    );
    assert_eq!(
        workspace.current_csv("addons-stage/integreatly-operator/integreatly-operator.package.yaml"),
        "integreatly-operator.v2.1.0-rc1"
    );
    assert_eq!(
        workspace.current_csv(
            "addons-production/integreatly-operator/integreatly-operator.package.yaml"
        ),
        "integreatly-operator.v2.0.0"
    );

    assert_eq!(*review.lookups.borrow(), vec!["service/managed-tenants"]);
    let drafts = review.drafts.borrow();
    let (source_project, draft) = drafts.first().unwrap();
    assert_eq!(source_project, "integreatly-qe/managed-tenants");
    assert_eq!(
        *draft,
        MergeRequestDraft {
            source_branch: "integreatly-operator-stage-v2.1.0-rc1".into(),
            target_branch: "master".into(),
            title: "Update integreatly-operator stage to 2.1.0-rc1".into(),
            description: "release notes".into(),
            target_project_id: 42,
        }
    );
}

#[test]
fn final_release_is_published_to_every_channel_in_order() {
    let workspace = Workspace::new("2.1.0");
    let catalog = FakeCatalog::on("master");
    let review = FakeReview::new();

    let merge_requests =
        run_channels(&workspace.context(), &catalog, &review, &version("2.1.0")).unwrap();

    assert_eq!(merge_requests.len(), 3);
    let branches: Vec<String> = review
        .drafts
        .borrow()
        .iter()
        .map(|(_, draft)| draft.source_branch.clone())
        .collect();
    assert_eq!(
        branches,
        vec![
            "integreatly-operator-stage-v2.1.0",
            "integreatly-operator-edge-v2.1.0",
            "integreatly-operator-stable-v2.1.0",
        ]
    );

    assert_eq!(
        workspace.current_csv(
            "addons-production/integreatly-operator-internal/integreatly-operator-internal.package.yaml"
        ),
        "integreatly-operator-internal.v2.1.0"
    );
    assert_eq!(
        workspace.current_csv(
            "addons-production/integreatly-operator/integreatly-operator.package.yaml"
        ),
        "integreatly-operator.v2.1.0"
    );
    assert!(
        workspace
            .catalog_path("addons-production/integreatly-operator-internal/2.1.0")
            .is_dir()
    );
    assert_eq!(*catalog.branch.borrow(), "master");
}

#[test]
fn failing_channel_stops_later_channels() {
    let workspace = Workspace::new("2.1.0");
    let catalog = FakeCatalog::on("master");
    let mut review = FakeReview::new();
    review.reject_branches_containing = Some("-edge-");

    let err = run_channels(&workspace.context(), &catalog, &review, &version("2.1.0")).unwrap_err();

    let AppError::Release {
        channel, source, ..
    } = err
    else {
        panic!("expected a release error");
    };
    assert_eq!(channel, ReleaseChannel::Edge);
    assert!(matches!(
        source,
        ReleaseError::MergeRequestCreateFailed { ref branch, .. }
            if branch == "integreatly-operator-edge-v2.1.0"
    ));

    // Stage went through, stable was never started and the catalog stays on edge.
    assert_eq!(review.drafts.borrow().len(), 1);
    assert!(
        !catalog
            .calls()
            .iter()
            .any(|call| call.contains("integreatly-operator-stable"))
    );
    assert_eq!(*catalog.branch.borrow(), "integreatly-operator-edge-v2.1.0");
}

#[test]
fn release_refuses_to_start_off_the_base_branch() {
    let workspace = Workspace::new("2.1.0");
    let catalog = FakeCatalog::on("some-feature");
    let review = FakeReview::new();
    let target = ReleaseTarget::new(ReleaseChannel::Stage, version("2.1.0"));

    let err = release(&workspace.context(), &catalog, &review, &target).unwrap_err();

    assert!(matches!(
        err,
        ReleaseError::NotOnBaseBranch { ref expected, ref actual }
            if expected == "master" && actual == "some-feature"
    ));
    assert_eq!(catalog.calls(), vec!["current_branch"]);
    assert!(
        !workspace
            .catalog_path("addons-stage/integreatly-operator/2.1.0")
            .exists()
    );
    assert_eq!(
        workspace.current_csv("addons-stage/integreatly-operator/integreatly-operator.package.yaml"),
        "integreatly-operator.v2.0.0"
    );
}

#[test]
fn release_honours_configured_base_branch() {
    let mut workspace = Workspace::new("2.1.0");
    workspace.settings.base_branch = "main".into();
    let catalog = FakeCatalog::on("main");
    let review = FakeReview::new();
    let target = ReleaseTarget::new(ReleaseChannel::Stable, version("2.1.0"));

    release(&workspace.context(), &catalog, &review, &target).unwrap();

    assert_eq!(catalog.calls().last().unwrap(), "checkout main");
    assert_eq!(review.drafts.borrow().first().unwrap().1.target_branch, "main");
}

#[test]
fn branch_lookup_failure_is_reported() {
    let workspace = Workspace::new("2.1.0");
    let mut catalog = FakeCatalog::on("master");
    catalog.fail_on = Some("rev-parse");
    let target = ReleaseTarget::new(ReleaseChannel::Stage, version("2.1.0"));

    let err = release(&workspace.context(), &catalog, &FakeReview::new(), &target).unwrap_err();

    assert!(matches!(err, ReleaseError::BranchLookupFailed(_)));
}

#[test]
fn dirty_tree_after_commit_stops_before_push() {
    let workspace = Workspace::new("2.1.0");
    let mut catalog = FakeCatalog::on("master");
    catalog.dirty = vec!["?? addons-stage/stray.yaml".into()];
    let review = FakeReview::new();
    let target = ReleaseTarget::new(ReleaseChannel::Stage, version("2.1.0"));

    let err = release(&workspace.context(), &catalog, &review, &target).unwrap_err();

    let ReleaseError::DirtyTreeAfterCommit { changes } = err else {
        panic!("expected DirtyTreeAfterCommit");
    };
    assert_eq!(changes, vec!["?? addons-stage/stray.yaml"]);
    assert!(!catalog.calls().iter().any(|call| call.starts_with("push")));
    assert!(review.lookups.borrow().is_empty());
}

#[test]
fn push_failure_is_reported_with_branch_and_remote() {
    let workspace = Workspace::new("2.1.0");
    let mut catalog = FakeCatalog::on("master");
    catalog.fail_on = Some("push");
    let review = FakeReview::new();
    let target = ReleaseTarget::new(ReleaseChannel::Edge, version("2.1.0"));

    let err = release(&workspace.context(), &catalog, &review, &target).unwrap_err();

    assert!(matches!(
        err,
        ReleaseError::PushFailed { ref branch, ref remote, .. }
            if branch == "integreatly-operator-edge-v2.1.0" && remote == "fork"
    ));
    assert!(review.drafts.borrow().is_empty());
}

#[test]
fn malformed_package_index_stops_before_commit() {
    let workspace = Workspace::new("2.1.0");
    let index = workspace
        .catalog_path("addons-stage/integreatly-operator/integreatly-operator.package.yaml");
    fs::write(&index, "packageName: integreatly\n").unwrap();
    let catalog = FakeCatalog::on("master");
    let target = ReleaseTarget::new(ReleaseChannel::Stage, version("2.1.0"));

    let err = release(&workspace.context(), &catalog, &FakeReview::new(), &target).unwrap_err();

    assert!(matches!(
        err,
        ReleaseError::Catalog(CatalogError::PackageIndex { .. })
    ));
    assert_eq!(fs::read_to_string(&index).unwrap(), "packageName: integreatly\n");
    assert!(!catalog.calls().iter().any(|call| call.starts_with("commit")));
}

#[test]
fn missing_manifests_stop_before_staging() {
    let workspace = Workspace::new("2.1.0");
    let catalog = FakeCatalog::on("master");
    let target = ReleaseTarget::new(ReleaseChannel::Stage, version("2.2.0"));

    let err = release(&workspace.context(), &catalog, &FakeReview::new(), &target).unwrap_err();

    assert!(matches!(
        err,
        ReleaseError::Catalog(CatalogError::SourceNotFound { .. })
    ));
    assert_eq!(
        catalog.calls(),
        vec!["current_branch", "checkout -b integreatly-operator-stage-v2.2.0"]
    );
}

#[test]
fn restore_failure_keeps_merge_request_url() {
    let workspace = Workspace::new("2.1.0");
    let mut catalog = FakeCatalog::on("master");
    catalog.fail_on = Some("checkout");
    let target = ReleaseTarget::new(ReleaseChannel::Stage, version("2.1.0"));

    let err = release(&workspace.context(), &catalog, &FakeReview::new(), &target).unwrap_err();

    let ReleaseError::RestoreFailed { url, branch, .. } = err else {
        panic!("expected RestoreFailed");
    };
    assert_eq!(
        url,
        "https://gitlab.example.com/service/managed-tenants/-/merge_requests/1"
    );
    assert_eq!(branch, "master");
}

#[test]
fn branch_create_failure_stops_before_copying() {
    let workspace = Workspace::new("2.1.0");
    let mut catalog = FakeCatalog::on("master");
    catalog.fail_on = Some("checkout -b");
    let target = ReleaseTarget::new(ReleaseChannel::Stage, version("2.1.0"));

    let err = release(&workspace.context(), &catalog, &FakeReview::new(), &target).unwrap_err();

    assert!(matches!(
        err,
        ReleaseError::BranchCreateFailed { ref branch, .. }
            if branch == "integreatly-operator-stage-v2.1.0"
    ));
    assert_eq!(
        catalog.calls(),
        vec!["current_branch", "checkout -b integreatly-operator-stage-v2.1.0"]
    );
    assert!(
        !workspace
            .catalog_path("addons-stage/integreatly-operator/2.1.0")
            .exists()
    );
}

#[test]
fn stage_failure_stops_before_package_index_update() {
    let workspace = Workspace::new("2.1.0");
    let mut catalog = FakeCatalog::on("master");
    catalog.fail_on = Some("add");
    let target = ReleaseTarget::new(ReleaseChannel::Stage, version("2.1.0"));

    let err = release(&workspace.context(), &catalog, &FakeReview::new(), &target).unwrap_err();

    assert!(matches!(err, ReleaseError::StageFailed(_)));
    let calls = catalog.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.last().unwrap().starts_with("add addons-stage/integreatly-operator/2.1.0/"));
    assert_eq!(
        workspace.current_csv("addons-stage/integreatly-operator/integreatly-operator.package.yaml"),
        "integreatly-operator.v2.0.0"
    );
}

#[test]
fn commit_failure_stops_before_push() {
    let workspace = Workspace::new("2.1.0");
    let mut catalog = FakeCatalog::on("master");
    catalog.fail_on = Some("commit");
    let review = FakeReview::new();
    let target = ReleaseTarget::new(ReleaseChannel::Stage, version("2.1.0"));

    let err = release(&workspace.context(), &catalog, &review, &target).unwrap_err();

    assert!(matches!(err, ReleaseError::CommitFailed(_)));
    let calls = catalog.calls();
    assert!(calls.last().unwrap().starts_with("commit "));
    assert!(!calls.iter().any(|call| call == "status" || call.starts_with("push")));
    assert!(review.lookups.borrow().is_empty());
}
