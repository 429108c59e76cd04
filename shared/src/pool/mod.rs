pub mod graveyard;
pub mod object_lookup;
pub mod object_pool;
pub mod pool_index;
pub mod weak_object_pool;
