use crate::model::ScenarioError;
use crate::provider::mongo::MongoShell;
use crate::scenario::{Scenario, StepSink};
use async_trait::async_trait;

const COLLECTION: &str = "write_conflict_demo";

pub(crate) const SCRIPT: &str = r#"
const dbx = db.getSiblingDB("txdemo");
const coll = dbx.write_conflict_demo;

step({is_header: true, description: "⚔️ Write Conflict Detection Demonstration"});

const initial = coll.findOne({accountId: "ACC-12345"});
step({session: "Setup",
      description: "Initial account state",
      query: 'db.write_conflict_demo.findOne({accountId: "ACC-12345"})',
      result: "holder: " + initial.holder + ", balance: $" + initial.balance});

const sessionA = db.getMongo().startSession();
sessionA.startTransaction({readConcern: {level: "snapshot"}});
step({session: "Session A",
      description: "Starting transaction (snapshot isolation)",
      query: "session.startTransaction({readConcern: 'snapshot'})",
      result: "Transaction started"});

const collA = sessionA.getDatabase("txdemo").write_conflict_demo;
const readA = collA.findOne({accountId: "ACC-12345"});
step({session: "Session A",
      description: "Reading current balance",
      query: 'db.write_conflict_demo.findOne({accountId: "ACC-12345"})',
      result: "balance: $" + readA.balance + " - plans to withdraw $600"});

const sessionB = db.getMongo().startSession();
sessionB.startTransaction({readConcern: {level: "snapshot"}});
step({session: "Session B",
      description: "Starting SEPARATE transaction",
      query: "session.startTransaction({readConcern: 'snapshot'})",
      result: "Transaction started"});

sleep(500);

const collB = sessionB.getDatabase("txdemo").write_conflict_demo;
collB.updateOne({accountId: "ACC-12345"}, {$inc: {balance: -700}});
step({session: "Session B",
      description: "Withdrawing $700 from account",
      query: 'db.write_conflict_demo.updateOne({accountId: "ACC-12345"}, {$inc: {balance: -700}})',
      result: "Update applied within Session B's transaction"});

sessionB.commitTransaction();
sessionB.endSession();
step({session: "Session B",
      description: "Committing transaction",
      query: "session.commitTransaction()",
      result: "Committed - balance is now $300"});

sleep(500);

let conflict = false;
try {
    collA.updateOne({accountId: "ACC-12345"}, {$inc: {balance: -600}});
    sessionA.commitTransaction();
} catch (e) {
    conflict = true;
    try { sessionA.abortTransaction(); } catch (_) {}
    step({session: "Session A",
          description: "Now attempting to withdraw $600 (Session A's original plan)",
          query: 'db.write_conflict_demo.updateOne({accountId: "ACC-12345"}, {$inc: {balance: -600}})',
          result: "WriteConflict! " + e.codeName,
          success: false});
    step({is_header: true,
          description: "🛡️ Write conflict detected! Session A's withdrawal was rejected instead of silently overdrawing"});
}
if (!conflict) {
    step({session: "Session A",
          description: "Transaction result",
          query: "session.commitTransaction()",
          result: "Unexpectedly committed (no conflict raised)",
          success: false});
}
sessionA.endSession();

sleep(500);
const finalDoc = coll.findOne({accountId: "ACC-12345"});
step({session: "Session B",
      description: "Final account state",
      query: 'db.write_conflict_demo.findOne({accountId: "ACC-12345"})',
      result: "balance: $" + finalDoc.balance});

step({is_header: true,
      description: "🎉 Write conflict detection prevented a potential $300 overdraft!"});
"#;

/// Shows that two snapshot transactions writing the same document make the
/// second writer fail with a write conflict.
pub struct WriteConflictScenario {
    shell: MongoShell,
}

impl WriteConflictScenario {
    pub fn new(shell: MongoShell) -> Self {
        Self { shell }
    }
}

#[async_trait]
impl Scenario for WriteConflictScenario {
    fn name(&self) -> &str {
        "Write Conflict Detection"
    }

    fn description(&self) -> &str {
        "Demonstrates how MongoDB detects conflicting writes between\n\
         concurrent transactions.\n\
         \n\
         This scenario shows:\n\
         1. An account holds $1000\n\
         2. Session A starts a transaction and reads the balance\n\
         3. Session B starts a separate transaction, withdraws $700, commits\n\
         4. Session A attempts its own withdrawal of $600\n\
         5. MongoDB raises a WriteConflict instead of allowing an overdraft"
    }

    fn isolation_level(&self) -> &str {
        "Serializable (Write Conflicts)"
    }

    async fn setup(&self) -> Result<(), ScenarioError> {
        self.shell
            .eval(
                "db.write_conflict_demo.drop(); \
                 db.write_conflict_demo.insertOne({accountId: 'ACC-12345', holder: 'John Doe', balance: 1000})",
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
