use crate::model::ScenarioError;
use crate::provider::mongo::MongoShell;
use crate::scenario::{Scenario, StepSink};
use async_trait::async_trait;

const COLLECTION: &str = "dirty_read_demo";

pub(crate) const SCRIPT: &str = r#"
const dbx = db.getSiblingDB("txdemo");
const coll = dbx.dirty_read_demo;

step({is_header: true, description: "🔒 Dirty Read Prevention Demonstration"});

step({session: "Setup",
      description: "Checking initial state - collection should be empty",
      query: "db.dirty_read_demo.countDocuments({})",
      result: "Count: " + coll.countDocuments({})});

const sessionA = db.getMongo().startSession();
sessionA.startTransaction();
step({session: "Session A",
      description: "Starting a transaction",
      query: "session.startTransaction()",
      result: "Transaction started"});

const collA = sessionA.getDatabase("txdemo").dirty_read_demo;
collA.insertOne({product: "Widget", price: 29.99, status: "pending"});
step({session: "Session A",
      description: "Inserted document within transaction (NOT YET COMMITTED)",
      query: 'db.dirty_read_demo.insertOne({product: "Widget", price: 29.99, status: "pending"})',
      result: "Insert successful (within transaction)"});

sleep(500);

const before = dbx.runCommand({find: "dirty_read_demo", filter: {},
                               readConcern: {level: "majority"}}).cursor.firstBatch;
step({session: "Session B",
      description: "Reading documents with readConcern: majority (outside Session A's transaction)",
      query: 'db.dirty_read_demo.find({}).readConcern("majority")',
      result: "Documents found: " + before.length + " (uncommitted data NOT visible!)"});

step({is_header: true,
      description: "✅ Dirty read prevented! Session B cannot see Session A's uncommitted data"});

sleep(500);
sessionA.commitTransaction();
step({session: "Session A",
      description: "Committing the transaction",
      query: "session.commitTransaction()",
      result: "Transaction committed successfully"});

sleep(500);
const after = coll.find({}).toArray();
step({session: "Session B",
      description: "Reading documents again after Session A committed",
      query: "db.dirty_read_demo.find({})",
      result: "Documents found: " + after.length + "\n" +
              JSON.stringify(after.map(d => ({product: d.product, price: d.price, status: d.status})))});

step({is_header: true,
      description: "🎉 After commit, Session B can now see Session A's data"});

sessionA.endSession();
"#;

/// Shows that reads with majority read concern never observe another
/// session's uncommitted writes.
pub struct DirtyReadScenario {
    shell: MongoShell,
}

impl DirtyReadScenario {
    pub fn new(shell: MongoShell) -> Self {
        Self { shell }
    }
}

#[async_trait]
impl Scenario for DirtyReadScenario {
    fn name(&self) -> &str {
        "Dirty Read Prevention"
    }

    fn description(&self) -> &str {
        "Demonstrates how MongoDB transactions prevent dirty reads.\n\
         \n\
         Without transactions, reads might see uncommitted data. With transactions\n\
         and proper read concern, you only see committed data.\n\
         \n\
         This scenario shows:\n\
         1. Session A starts a transaction and inserts a document\n\
         2. Session B tries to read - document is NOT visible (not committed yet)\n\
         3. Session A commits the transaction\n\
         4. Session B reads again - document IS now visible"
    }

    fn isolation_level(&self) -> &str {
        "Read Committed"
    }

    async fn setup(&self) -> Result<(), ScenarioError> {
        super::drop_collection(&self.shell, COLLECTION)
            .await
            .map_err(ScenarioError::Setup)
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
