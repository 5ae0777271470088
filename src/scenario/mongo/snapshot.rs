use crate::model::ScenarioError;
use crate::provider::mongo::MongoShell;
use crate::scenario::{Scenario, StepSink};
use async_trait::async_trait;

const COLLECTION: &str = "snapshot_demo";

pub(crate) const SCRIPT: &str = r#"
const dbx = db.getSiblingDB("txdemo");
const coll = dbx.snapshot_demo;

step({is_header: true, description: "📸 Snapshot Isolation Demonstration"});

step({session: "Setup",
      description: "Initial inventory state",
      query: "db.snapshot_demo.countDocuments({})",
      result: "Products in inventory: " + coll.countDocuments({})});

const sessionA = db.getMongo().startSession();
sessionA.startTransaction({readConcern: {level: "snapshot"}});
step({session: "Session A",
      description: "Starting transaction with SNAPSHOT isolation",
      query: "session.startTransaction({readConcern: 'snapshot'})",
      result: "Transaction started - snapshot taken NOW"});

const collA = sessionA.getDatabase("txdemo").snapshot_demo;
step({session: "Session A",
      description: "Reading product count within snapshot transaction",
      query: "db.snapshot_demo.countDocuments({})",
      result: "Products visible: " + collA.countDocuments({})});

sleep(500);

coll.insertOne({sku: "GADGET-002", name: "Ultra Gadget", quantity: 10});
step({session: "Session B",
      description: "Inserting NEW product (outside of Session A's transaction)",
      query: 'db.snapshot_demo.insertOne({sku: "GADGET-002", name: "Ultra Gadget", quantity: 10})',
      result: "New product inserted and COMMITTED immediately"});

step({session: "Session B",
      description: "Session B verifies new product exists",
      query: "db.snapshot_demo.countDocuments({})",
      result: "Products visible: " + coll.countDocuments({})});

sleep(500);

step({session: "Session A",
      description: "Session A reads product count AGAIN (still in same transaction)",
      query: "db.snapshot_demo.countDocuments({})",
      result: "Products visible: " + collA.countDocuments({}) + " (snapshot unchanged)"});

step({is_header: true,
      description: "✅ Snapshot isolation in action! Session A still sees 3 products, even though Session B committed a 4th"});

sleep(500);
sessionA.commitTransaction();
step({session: "Session A",
      description: "Committing Session A's transaction",
      query: "session.commitTransaction()",
      result: "Transaction committed"});

step({session: "Session A",
      description: "Session A reads after transaction ends",
      query: "db.snapshot_demo.countDocuments({})",
      result: "Products visible: " + coll.countDocuments({})});

step({is_header: true,
      description: "🎉 Snapshot isolation provides a consistent view throughout the entire transaction"});

sessionA.endSession();
"#;

/// Shows that a snapshot transaction keeps reading from the point in time at
/// which it started, regardless of concurrent commits.
pub struct SnapshotIsolationScenario {
    shell: MongoShell,
}

impl SnapshotIsolationScenario {
    pub fn new(shell: MongoShell) -> Self {
        Self { shell }
    }
}

#[async_trait]
impl Scenario for SnapshotIsolationScenario {
    fn name(&self) -> &str {
        "Snapshot Isolation"
    }

    fn description(&self) -> &str {
        "Demonstrates snapshot isolation using MongoDB's readConcern: snapshot.\n\
         \n\
         All reads in the transaction see data from the same point in time: the\n\
         snapshot taken at the START of the transaction. Changes committed by\n\
         other transactions after that point are invisible.\n\
         \n\
         This scenario shows:\n\
         1. Initial inventory with 3 products\n\
         2. Session A starts a snapshot transaction and sees 3 products\n\
         3. Session B adds a product and commits immediately\n\
         4. Session A reads again - STILL sees only 3 products\n\
         5. After Session A ends, the new product becomes visible"
    }

    fn isolation_level(&self) -> &str {
        "Snapshot (Repeatable Read)"
    }

    async fn setup(&self) -> Result<(), ScenarioError> {
        self.shell
            .eval(
                "db.snapshot_demo.drop(); \
                 db.snapshot_demo.insertMany([\
                   {sku: 'WIDGET-001', name: 'Blue Widget', quantity: 100}, \
                   {sku: 'WIDGET-002', name: 'Red Widget', quantity: 50}, \
                   {sku: 'GADGET-001', name: 'Super Gadget', quantity: 25}])",
            )
            .await
            .map(|_| ())
            .map_err(|e| ScenarioError::Setup(format!("{e:#}")))
    }

    async fn run(&self, sink: StepSink) -> Result<(), ScenarioError> {
        super::stream_script(&self.shell, SCRIPT, sink).await
    }

    async fn cleanup(&self) -> Result<(), ScenarioError> {
        super::drop_collection(&self.shell, COLLECTION)
            .await
            .map_err(ScenarioError::Cleanup)
    }
}
