/*!
A library for proving memory safety of C programs via symbolic memory graphs.

# What is a symbolic memory graph

A symbolic memory graph (SMG) is an abstract, graph-based model of the memory
state of a program at a given program point.
Nodes of the graph are memory objects (stack variables, heap allocations,
globals and the designated null object) and abstract values,
while edges record which value is stored at which offset inside an object
(*has-value* edges) and which object an abstract value points to when
interpreted as a pointer (*points-to* edges).
An analysis can use the graph to prove or refute memory-safety properties,
e.g. invalid dereferences, invalid frees and memory leaks,
without executing the program under analysis.

# Structure of the library

The [`smg`] module contains the base graph together with its vocabulary types
and the debug-time consistency verifier.
The base graph performs no automatic invariant repair:
every mutation primitive does exactly the bookkeeping it names
and callers opt into consistency verification out-of-band.

The [`analysis::c_memory`](crate::analysis::c_memory) module layers
C semantics on top of the base graph:
a call stack of frames holding named local variables,
heap and global partitions of the object universe,
scope resolution for visible variables
and a mark-and-sweep pruning pass that reclaims unreachable objects and
values while detecting memory leaks.

Analysis state is branched by cloning:
a clone is a fully independent snapshot that never shares mutable collections
with its source, so exploration branches can diverge freely.
*/

pub mod analysis;
pub mod c_model;
pub mod smg;
pub mod utils;

mod prelude {
    pub use anyhow::{anyhow, Error};
    pub use serde::{Deserialize, Serialize};

    pub use crate::c_model::{ByteSize, CType, MachineModel};
}
